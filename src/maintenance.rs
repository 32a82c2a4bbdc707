//! Opportunistic background maintenance.
//!
//! Posts schedule cleanup through a bounded queue; a dedicated worker thread
//! prunes excess messages and stale listeners. The queue holds a single
//! pending request, so bursts of posts collapse into one pass and a post
//! never blocks on cleanup.

use crate::error::Result;
use crate::listeners::ListenerRegistry;
use crate::store::MessageStore;
use crossbeam_channel::{bounded, Sender, TrySendError};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// Handle to the maintenance worker.
///
/// The worker thread exits once the handle is dropped and the queue drains.
pub struct Maintenance {
    requests: Sender<()>,
}

impl Maintenance {
    /// Spawn the worker thread.
    pub fn spawn(store: Arc<MessageStore>, registry: Arc<ListenerRegistry>) -> Result<Self> {
        let (requests, rx) = bounded::<()>(1);

        thread::Builder::new()
            .name("relay-maintenance".into())
            .spawn(move || {
                while rx.recv().is_ok() {
                    let messages = store.prune();
                    let listeners = registry.prune_stale();
                    if messages > 0 || listeners > 0 {
                        debug!(messages, listeners, "maintenance pass complete");
                    }
                }
            })?;

        Ok(Self { requests })
    }

    /// Request a maintenance pass.
    ///
    /// A full queue means a pass is already pending; the next opportunistic
    /// trigger retries, so a skipped request is never lost for good.
    pub fn request(&self) {
        match self.requests.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {
                warn!("maintenance worker is gone, cleanup skipped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use std::time::Duration;

    #[test]
    fn test_request_prunes_messages_and_listeners() {
        let config = RelayConfig {
            max_messages: 2,
            ..Default::default()
        };
        let store = Arc::new(MessageStore::new(&config));
        // Zero max idle: every listener is immediately stale.
        let registry = Arc::new(ListenerRegistry::new(Duration::ZERO));
        let maintenance =
            Maintenance::spawn(Arc::clone(&store), Arc::clone(&registry)).unwrap();

        for i in 0..5 {
            store.append(format!("m{i}")).unwrap();
        }
        registry.register(None);

        maintenance.request();

        // The worker runs asynchronously; give it a bounded window.
        for _ in 0..100 {
            if store.len() <= 2 && registry.is_empty() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!(
            "maintenance did not run: {} messages, {} listeners",
            store.len(),
            registry.len()
        );
    }

    #[test]
    fn test_request_with_full_queue_is_dropped() {
        let config = RelayConfig::default();
        let store = Arc::new(MessageStore::new(&config));
        let registry = Arc::new(ListenerRegistry::new(config.listener_max_idle));
        let maintenance = Maintenance::spawn(store, registry).unwrap();

        // Flooding the queue must never block the caller.
        for _ in 0..10 {
            maintenance.request();
        }
    }
}
