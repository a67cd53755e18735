use crate::error::{QueueError, Result};
use tracing_subscriber::EnvFilter;

/// Installs the global `fmt` subscriber, logging to stderr.
///
/// `RUST_LOG` takes precedence over `default_level`.
pub fn init_tracing(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| QueueError::InternalError(Box::new(e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(QueueError::InternalError)
}
