//! Log output setup.

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Pick the log filter.
///
/// An explicit CLI level wins, then `RUST_LOG`, then the configured level.
pub fn filter(cli_level: Option<&str>, configured: &str) -> Result<EnvFilter> {
    if let Some(level) = cli_level {
        return EnvFilter::try_new(level).with_context(|| format!("invalid log level '{}'", level));
    }
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(configured)
            .with_context(|| format!("invalid logging.level '{}'", configured)),
    }
}

/// Install the global subscriber: an env filter over formatted output.
pub fn init(filter: EnvFilter) -> Result<()> {
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .context("failed to install log subscriber")
}
