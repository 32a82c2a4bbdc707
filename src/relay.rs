//! Main Relay struct tying all components together.

use crate::config::RelayConfig;
use crate::error::Result;
use crate::listeners::ListenerRegistry;
use crate::maintenance::Maintenance;
use crate::store::MessageStore;
use crate::stream::{StreamDispatcher, SubscriptionHandle};
use crate::types::{Listener, ListenerId, Message, MessageId};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The message relay.
///
/// Provides a unified interface for:
/// - Posting messages (with opportunistic cleanup)
/// - Listing retained messages
/// - Subscribing to the live stream with a resumable cursor
pub struct Relay {
    /// Relay configuration.
    config: RelayConfig,

    /// Message store.
    store: Arc<MessageStore>,

    /// Listener registry.
    listeners: Arc<ListenerRegistry>,

    /// Stream dispatcher.
    dispatcher: StreamDispatcher,

    /// Background maintenance worker.
    maintenance: Maintenance,

    /// Root cancellation token for all streaming loops.
    shutdown: CancellationToken,
}

impl Relay {
    /// Create a relay with the given configuration.
    pub fn new(config: RelayConfig) -> Result<Self> {
        let store = Arc::new(MessageStore::new(&config));
        let listeners = Arc::new(ListenerRegistry::new(config.listener_max_idle));
        let shutdown = CancellationToken::new();

        let dispatcher = StreamDispatcher::new(
            Arc::clone(&store),
            Arc::clone(&listeners),
            &config,
            shutdown.clone(),
        );
        let maintenance = Maintenance::spawn(Arc::clone(&store), Arc::clone(&listeners))?;

        Ok(Self {
            config,
            store,
            listeners,
            dispatcher,
            maintenance,
            shutdown,
        })
    }

    /// Post a message.
    ///
    /// Appends to the store and schedules a maintenance pass when the prune
    /// interval has elapsed. Validation failures do not affect listeners or
    /// retained messages.
    pub fn post(&self, content: impl Into<String>) -> Result<Message> {
        let message = self.store.append(content)?;
        if self.store.prune_due() {
            self.maintenance.request();
        }
        Ok(message)
    }

    /// All retained messages after `after`, ascending (all when `None`).
    pub fn messages_since(&self, after: Option<MessageId>) -> Vec<Message> {
        self.store.list_since(after)
    }

    /// Register a listener that only sees messages posted from now on.
    pub fn register_from_now(&self) -> Listener {
        self.listeners.register(self.store.newest_id())
    }

    /// Subscribe to the live stream.
    ///
    /// Resumes `listener` when it is still registered; otherwise (or when
    /// `None`) a fresh listener is created from "now".
    pub fn subscribe(&self, listener: Option<ListenerId>) -> SubscriptionHandle {
        self.dispatcher.subscribe(listener)
    }

    /// Cancel all streaming loops.
    ///
    /// Used on server shutdown; posting and listing keep working.
    pub fn shutdown(&self) {
        info!("relay shutting down, closing stream loops");
        self.shutdown.cancel();
    }

    /// Relay configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// The message store.
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// The listener registry.
    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    /// The stream dispatcher.
    pub fn dispatcher(&self) -> &StreamDispatcher {
        &self.dispatcher
    }
}
