//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use docqa_core::{Error, Result};

pub const DEFAULT_FILTER: &str = "docqa=info";

/// Filter used when `RUST_LOG` is unset
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose { "docqa=debug" } else { DEFAULT_FILTER }
}

/// Install the global subscriber, writing to stderr so stdout stays clean
/// for answers and `--json` output.
pub fn init_logging(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| Error::Configuration(format!("failed to install logger: {}", e)))
}
