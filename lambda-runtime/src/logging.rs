//! Default subscriber wiring for the `LOG_LEVEL` environment variable.
//!
//! The platform's own level names (`trace`, `debug`, `info`, `notice`,
//! `warning`, `error`, `critical`) don't map one-to-one onto `tracing`'s
//! five-level scale, so this module owns the mapping rather than pushing it
//! onto `lambda_runtime_api_client::tracing`, which only knows `tracing`'s
//! own level names.

use lambda_runtime_api_client::tracing::subscriber::{filter::LevelFilter, EnvFilter};
use tracing::Level;

fn level_from_log_level(raw: &str) -> Level {
    match raw.to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "notice" => Level::INFO,
        "warning" => Level::WARN,
        "critical" => Level::ERROR,
        // `info` and `error` already line up with `tracing::Level`'s names.
        other => other.parse().unwrap_or(Level::INFO),
    }
}

/// Install the default subscriber, reading the threshold from `LOG_LEVEL`
/// (defaulting to `info` when unset or unrecognized). Writes to stdout
/// without timestamps or target names, since CloudWatch stamps ingestion
/// time itself.
///
/// Idempotent in the sense that a second call is harmless: `tracing`'s
/// `set_global_default` failure (a subscriber already installed) is
/// swallowed rather than panicking, so tests that spin up the driver more
/// than once in the same process don't need to guard this call.
pub fn init() {
    let level = std::env::var("LOG_LEVEL")
        .ok()
        .map(|v| level_from_log_level(&v))
        .unwrap_or(Level::INFO);

    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .without_time()
        .with_env_filter(EnvFilter::builder().with_default_directive(LevelFilter::from_level(level).into()).from_env_lossy())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_platform_level_names_onto_tracing_levels() {
        assert_eq!(level_from_log_level("notice"), Level::INFO);
        assert_eq!(level_from_log_level("warning"), Level::WARN);
        assert_eq!(level_from_log_level("critical"), Level::ERROR);
        assert_eq!(level_from_log_level("trace"), Level::TRACE);
        assert_eq!(level_from_log_level("debug"), Level::DEBUG);
        assert_eq!(level_from_log_level("info"), Level::INFO);
        assert_eq!(level_from_log_level("error"), Level::ERROR);
    }

    #[test]
    fn unrecognized_level_falls_back_to_info() {
        assert_eq!(level_from_log_level("bogus"), Level::INFO);
    }
}
