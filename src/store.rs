//! Append-only message store.
//!
//! Messages live in a single in-memory deque ordered by id. The store caps
//! retention at a configured count; pruning drops the oldest excess and is
//! rate-limited through [`MessageStore::prune_due`] so bursts of posts
//! schedule at most one maintenance pass per interval.

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::types::{Message, MessageId, Timestamp};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Append-only, bounded message log.
pub struct MessageStore {
    /// Retained messages, ascending by id.
    messages: RwLock<VecDeque<Message>>,

    /// Next message id to assign.
    next_id: AtomicU64,

    /// When a maintenance pass was last scheduled.
    last_prune: Mutex<Instant>,

    /// Maximum content length in characters.
    max_content_len: usize,

    /// Maximum retained messages.
    max_messages: usize,

    /// Minimum time between maintenance passes.
    prune_interval: Duration,
}

impl MessageStore {
    /// Create an empty store.
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            messages: RwLock::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            last_prune: Mutex::new(Instant::now()),
            max_content_len: config.max_content_len,
            max_messages: config.max_messages,
            prune_interval: config.prune_interval,
        }
    }

    /// Append a message.
    ///
    /// Validates the content length, assigns the next id, and stamps the
    /// current UTC time. Id assignment happens under the write lock, so ids
    /// increase strictly in insertion order.
    pub fn append(&self, content: impl Into<String>) -> Result<Message> {
        let content = content.into();
        let len = content.chars().count();
        if len > self.max_content_len {
            return Err(RelayError::ContentTooLong {
                len,
                max: self.max_content_len,
            });
        }

        let mut messages = self.messages.write();
        let id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let message = Message {
            id,
            timestamp: Timestamp::now(),
            content,
        };
        messages.push_back(message.clone());

        Ok(message)
    }

    /// All retained messages with id greater than `after`, ascending.
    ///
    /// `None` means from the beginning. Each call takes a fresh snapshot;
    /// the result is finite and restartable.
    pub fn list_since(&self, after: Option<MessageId>) -> Vec<Message> {
        let messages = self.messages.read();
        let start = match after {
            Some(id) => messages.partition_point(|m| m.id <= id),
            None => 0,
        };
        messages.iter().skip(start).cloned().collect()
    }

    /// Id of the most recently appended, still-retained message.
    pub fn newest_id(&self) -> Option<MessageId> {
        self.messages.read().back().map(|m| m.id)
    }

    /// Number of retained messages.
    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    /// True when no messages are retained.
    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    /// Retain only the configured number of most-recent messages.
    ///
    /// Returns how many were dropped. Runs under the write lock, so the
    /// retention set is computed against a consistent snapshot; appends
    /// racing with the pass are picked up by the next one.
    pub fn prune(&self) -> usize {
        let mut messages = self.messages.write();
        let excess = messages.len().saturating_sub(self.max_messages);
        messages.drain(..excess);
        excess
    }

    /// True at most once per prune interval.
    ///
    /// The timestamp advances when this returns true, so concurrent posts
    /// collapse into a single scheduled pass.
    pub fn prune_due(&self) -> bool {
        let mut last = self.last_prune.lock();
        if last.elapsed() >= self.prune_interval {
            *last = Instant::now();
            true
        } else {
            false
        }
    }
}
