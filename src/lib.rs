//! # Message Relay
//!
//! A bounded, in-memory message relay: clients post short text messages and
//! subscribers follow a live stream with per-listener resumable cursors.
//!
//! ## Core Concepts
//!
//! - **Store**: append-only, monotonically-ordered message log, capped to
//!   the N most recent messages with opportunistic pruning
//! - **Listeners**: per-subscriber cursors and staleness tracking for
//!   resumable streaming
//! - **Dispatcher**: cancellable per-listener polling loops emitting
//!   messages in order
//!
//! ## Example
//!
//! ```ignore
//! use msgrelay::{Relay, RelayConfig};
//!
//! let relay = Relay::new(RelayConfig::default())?;
//!
//! // Post a message
//! relay.post("Hello, world!")?;
//!
//! // Follow the live stream
//! let mut sub = relay.subscribe(None);
//! while let Some(event) = sub.recv().await {
//!     println!("{}: {}", event.timestamp.0, event.content);
//! }
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod listeners;
pub mod logging;
pub mod maintenance;
pub mod relay;
pub mod store;
pub mod stream;
pub mod types;

// Re-exports
pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use listeners::ListenerRegistry;
pub use maintenance::Maintenance;
pub use relay::Relay;
pub use store::MessageStore;
pub use stream::{EventStream, StreamDispatcher, StreamEvent, SubscriptionHandle};
pub use types::{Listener, ListenerId, Message, MessageId, Timestamp};
