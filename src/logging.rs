//! Console logging setup
//!
//! Logs go to stderr through `tracing-subscriber`. The default level is
//! `info` (`debug` with `--verbose`); `RUST_LOG` overrides both.

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Install the global subscriber; call once at startup
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already set
pub fn init(verbose: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(verbose)))
        .context("Failed to create env filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to install tracing subscriber")?;

    Ok(())
}
