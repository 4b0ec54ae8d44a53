//! Subscriber setup for hosts embedding the collector.

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber. `RUST_LOG` wins when set; otherwise `info`,
/// or `debug` when `debug` is true. Returns false if a global subscriber
/// was already installed.
pub fn init_logging(debug: bool) -> bool {
    let fallback = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_target(false)
        .try_init()
        .is_ok()
}
