//! Logging setup for the relay binary.

use tracing_subscriber::EnvFilter;

/// Initialize tracing.
///
/// Honors `RUST_LOG` when set; otherwise defaults to `info`, or `debug`
/// with `verbose`.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
