//! Optional `tracing-subscriber` setup.

use tracing_subscriber::EnvFilter;

/// Installs a formatted `tracing` subscriber for the process.
///
/// `RUST_LOG` takes precedence; otherwise `default_directive` (for example
/// `"shard_query=debug"`) selects what is logged. Returns `false` if a
/// global subscriber was already installed.
pub fn init_logging(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
