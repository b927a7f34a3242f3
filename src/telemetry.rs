//! Logging Setup
//!
//! Optional `tracing` subscriber for hosts that do not install their own.

use tracing_subscriber::EnvFilter;

/// Environment variable read for the log filter before `RUST_LOG`
pub const LOG_ENV: &str = "MUXROUTE_LOG";

/// Install a fmt subscriber filtered by `MUXROUTE_LOG`, `RUST_LOG`, or `info`
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
