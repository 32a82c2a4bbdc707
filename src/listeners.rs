//! Listener registry: per-subscriber cursors and staleness tracking.
//!
//! Each active subscriber owns one entry keyed by an opaque [`ListenerId`].
//! The entry records how far the subscriber has been served (`cursor`) and
//! when it last polled (`last_seen`); entries idle beyond the max age are
//! collected by [`ListenerRegistry::prune_stale`].

use crate::error::{RelayError, Result};
use crate::types::{Listener, ListenerId, MessageId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Internal registry entry.
struct ListenerEntry {
    cursor: Option<MessageId>,
    last_seen: Instant,
}

/// Tracks active subscribers.
pub struct ListenerRegistry {
    /// Entries by listener id.
    entries: RwLock<HashMap<ListenerId, ListenerEntry>>,

    /// Counter for generating listener ids.
    next_id: AtomicU64,

    /// Entries idle longer than this are collected.
    max_idle: Duration,
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new(max_idle: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            max_idle,
        }
    }

    /// Register a new listener with the given starting cursor.
    ///
    /// `None` means "deliver from the beginning"; passing the store's newest
    /// id means the listener only sees messages posted after it connected.
    pub fn register(&self, cursor: Option<MessageId>) -> Listener {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.entries.write().insert(
            id,
            ListenerEntry {
                cursor,
                last_seen: Instant::now(),
            },
        );
        Listener { id, cursor }
    }

    /// Look up an existing listener.
    ///
    /// Fails with [`RelayError::ListenerNotFound`] for ids never issued or
    /// already collected; callers fall back to registering a fresh listener.
    pub fn resume(&self, id: ListenerId) -> Result<Listener> {
        let entries = self.entries.read();
        entries
            .get(&id)
            .map(|entry| Listener {
                id,
                cursor: entry.cursor,
            })
            .ok_or(RelayError::ListenerNotFound(id))
    }

    /// Record a delivery: advance the cursor and refresh `last_seen`.
    ///
    /// The cursor only moves forward; moving it backwards is a programming
    /// error on the caller's side.
    pub fn touch(&self, id: ListenerId, cursor: MessageId) -> Result<()> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(&id)
            .ok_or(RelayError::ListenerNotFound(id))?;
        debug_assert!(
            entry.cursor.map_or(true, |current| cursor >= current),
            "listener cursor moved backwards"
        );
        entry.cursor = Some(cursor);
        entry.last_seen = Instant::now();
        Ok(())
    }

    /// Refresh `last_seen` without moving the cursor.
    ///
    /// Called on empty polls so a connected-but-idle subscriber is not
    /// collected while nothing is being posted.
    pub fn heartbeat(&self, id: ListenerId) -> Result<()> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(&id)
            .ok_or(RelayError::ListenerNotFound(id))?;
        entry.last_seen = Instant::now();
        Ok(())
    }

    /// Remove listeners idle beyond the max age. Returns how many.
    pub fn prune_stale(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.last_seen.elapsed() < self.max_idle);
        before - entries.len()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
