//! Relay configuration.

use std::time::Duration;

/// Relay configuration.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Maximum message length in characters.
    /// Default: 128
    pub max_content_len: usize,

    /// Maximum number of retained messages.
    /// Default: 1024
    pub max_messages: usize,

    /// Minimum time between opportunistic maintenance passes.
    pub prune_interval: Duration,

    /// Listeners idle longer than this are collected.
    pub listener_max_idle: Duration,

    /// How long a dispatcher loop sleeps between empty polls. Bounds
    /// worst-case delivery latency and the store query rate.
    pub poll_interval: Duration,

    /// Buffered events per subscription before the dispatcher awaits the
    /// subscriber.
    pub event_buffer: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_content_len: 128,
            max_messages: 1024,
            prune_interval: Duration::from_secs(60),
            listener_max_idle: Duration::from_secs(300),
            poll_interval: Duration::from_secs(1),
            event_buffer: 64,
        }
    }
}
