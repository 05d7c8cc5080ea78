//! Default `tracing` subscriber wiring, re-exported so callers don't need a
//! direct dependency on `tracing`/`tracing-subscriber` just to turn logging
//! on.

use std::{env, str::FromStr};

pub use tracing::*;
pub use tracing_subscriber as subscriber;

use subscriber::filter::{EnvFilter, LevelFilter};

/// Install a default subscriber that writes to stdout without timestamps or
/// target names (the Lambda log collector stamps ingestion time itself).
///
/// The level is taken from the `LOG_LEVEL` environment variable, defaulting
/// to `info` when unset or unrecognized.
pub fn init_default_subscriber() {
    let level = env::var("LOG_LEVEL")
        .ok()
        .and_then(|v| Level::from_str(&v).ok())
        .unwrap_or(Level::INFO);

    tracing_subscriber::fmt()
        .with_target(false)
        .without_time()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(level).into())
                .from_env_lossy(),
        )
        .init();
}
