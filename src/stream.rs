//! Stream dispatcher: per-listener polling/catch-up loops.
//!
//! A subscription moves through a small lifecycle: resolve the listener
//! (resume or register from "now"), then loop — poll the store for messages
//! after the cursor, deliver them in order, advance the cursor, sleep when
//! idle — until the subscriber goes away or the relay shuts down. The loop
//! runs as its own tokio task and is cancelled through a token rather than
//! an unconditional blocking sleep.

use crate::config::RelayConfig;
use crate::listeners::ListenerRegistry;
use crate::store::MessageStore;
use crate::types::{Listener, ListenerId, Message, Timestamp};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

/// Wire shape of one delivered message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Unix seconds, UTC.
    pub timestamp: Timestamp,

    /// Message text.
    pub content: String,
}

impl From<&Message> for StreamEvent {
    fn from(message: &Message) -> Self {
        Self {
            timestamp: message.timestamp,
            content: message.content.clone(),
        }
    }
}

/// Handle to an active subscription.
///
/// Dropping the handle cancels the polling loop. The listener entry stays in
/// the registry, so the subscriber can resume with the same id within the
/// idle window.
pub struct SubscriptionHandle {
    /// Listener backing this subscription; reusable across reconnects.
    pub listener: ListenerId,

    events: mpsc::Receiver<StreamEvent>,
    cancel: DropGuard,
}

impl SubscriptionHandle {
    /// Receive the next event. `None` once the loop has closed.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// Consume the handle as a stream of events.
    pub fn into_stream(self) -> EventStream {
        EventStream {
            inner: ReceiverStream::new(self.events),
            _cancel: self.cancel,
        }
    }
}

/// Stream of events for one subscription; dropping it cancels the loop.
pub struct EventStream {
    inner: ReceiverStream<StreamEvent>,
    _cancel: DropGuard,
}

impl Stream for EventStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Runs the subscribe protocol and the per-listener polling loops.
pub struct StreamDispatcher {
    store: Arc<MessageStore>,
    registry: Arc<ListenerRegistry>,
    poll_interval: Duration,
    event_buffer: usize,
    shutdown: CancellationToken,
}

impl StreamDispatcher {
    /// Create a dispatcher over the given store and registry.
    ///
    /// Loops spawned by [`subscribe`](Self::subscribe) terminate when
    /// `shutdown` is cancelled.
    pub fn new(
        store: Arc<MessageStore>,
        registry: Arc<ListenerRegistry>,
        config: &RelayConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            registry,
            poll_interval: config.poll_interval,
            event_buffer: config.event_buffer,
            shutdown,
        }
    }

    /// Resolve the listener for a subscription.
    ///
    /// Resumes when the id is known. A missing or collected id falls back to
    /// a fresh listener cursored at the newest message ("subscribe from
    /// now"); messages posted between a listener's collection and its
    /// resubscription are skipped.
    pub fn resolve(&self, resume: Option<ListenerId>) -> Listener {
        if let Some(id) = resume {
            match self.registry.resume(id) {
                Ok(listener) => return listener,
                Err(err) => {
                    debug!(listener = %id, %err, "resume failed, registering fresh listener");
                }
            }
        }
        self.registry.register(self.store.newest_id())
    }

    /// One poll/delivery step for `listener`.
    ///
    /// Returns the messages after the cursor, ascending (possibly empty),
    /// advancing the cursor and the registry bookkeeping.
    pub fn poll_once(&self, listener: &mut Listener) -> Vec<Message> {
        let batch = self.store.list_since(listener.cursor);
        match batch.last() {
            Some(newest) => {
                listener.cursor = Some(newest.id);
                if let Err(err) = self.registry.touch(listener.id, newest.id) {
                    debug!(listener = %listener.id, %err, "cursor update for collected listener");
                }
            }
            None => {
                let _ = self.registry.heartbeat(listener.id);
            }
        }
        batch
    }

    /// Subscribe: resolve the listener and spawn its polling loop.
    ///
    /// Must be called within a tokio runtime.
    pub fn subscribe(&self, resume: Option<ListenerId>) -> SubscriptionHandle {
        let listener = self.resolve(resume);
        let (tx, rx) = mpsc::channel(self.event_buffer);
        let cancel = self.shutdown.child_token();

        let worker = DispatchLoop {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            poll_interval: self.poll_interval,
            listener,
            events: tx,
            cancel: cancel.clone(),
        };
        tokio::spawn(worker.run());

        SubscriptionHandle {
            listener: listener.id,
            events: rx,
            cancel: cancel.drop_guard(),
        }
    }
}

/// State for one active subscription's polling loop.
struct DispatchLoop {
    store: Arc<MessageStore>,
    registry: Arc<ListenerRegistry>,
    poll_interval: Duration,
    listener: Listener,
    events: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
}

impl DispatchLoop {
    /// Run until the subscriber goes away or the token is cancelled.
    ///
    /// The cursor advances only after a whole batch went out, so a torn-down
    /// subscriber may see redelivery on resume (at-least-once).
    async fn run(mut self) {
        debug!(listener = %self.listener.id, "stream loop started");
        'poll: loop {
            let batch = self.store.list_since(self.listener.cursor);

            if batch.is_empty() {
                let _ = self.registry.heartbeat(self.listener.id);
                tokio::select! {
                    () = self.cancel.cancelled() => break 'poll,
                    () = tokio::time::sleep(self.poll_interval) => continue 'poll,
                }
            }

            for message in &batch {
                let event = StreamEvent::from(message);
                tokio::select! {
                    () = self.cancel.cancelled() => break 'poll,
                    sent = self.events.send(event) => {
                        if sent.is_err() {
                            // Subscriber is gone; the transport closed.
                            break 'poll;
                        }
                    }
                }
            }

            if let Some(newest) = batch.last() {
                self.listener.cursor = Some(newest.id);
                if let Err(err) = self.registry.touch(self.listener.id, newest.id) {
                    debug!(listener = %self.listener.id, %err, "cursor update for collected listener");
                }
            }
        }
        debug!(listener = %self.listener.id, "stream loop closed");
    }
}
