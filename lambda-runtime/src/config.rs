//! Runtime configuration, read once at startup.
//!
//! Mirrors the teacher crate's `Config::from_env` boundary: environment
//! access happens here and nowhere else, so the rest of the crate takes a
//! plain value by ownership.

use std::env;
use std::time::Duration;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 7000;

/// The host and port of the Runtime API, plus an optional client-side
/// timeout for reporting requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Runtime API host.
    pub host: String,
    /// Runtime API port.
    pub port: u16,
    /// Timeout applied to `response`/`error`/`init/error` POSTs. `next`
    /// requests never time out client-side.
    pub request_timeout: Option<Duration>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            request_timeout: None,
        }
    }
}

impl RuntimeConfig {
    /// Read configuration from the process environment.
    ///
    /// `AWS_LAMBDA_RUNTIME_API` (`host:port`) overrides the default address;
    /// `REQUEST_TIMEOUT` (integer milliseconds) sets the reporting timeout.
    /// Values that are present but malformed are reported as an error rather
    /// than silently falling back, since a silently-ignored typo would
    /// produce a runtime that configured itself against the wrong endpoint.
    pub fn from_env() -> Result<Self, ConfigError> {
        let (host, port) = match env::var("AWS_LAMBDA_RUNTIME_API") {
            Ok(value) => parse_host_port(&value)?,
            Err(env::VarError::NotPresent) => (DEFAULT_HOST.to_string(), DEFAULT_PORT),
            Err(env::VarError::NotUnicode(_)) => return Err(ConfigError::NotUnicode("AWS_LAMBDA_RUNTIME_API")),
        };

        let request_timeout = match env::var("REQUEST_TIMEOUT") {
            Ok(value) => Some(Duration::from_millis(
                value
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidRequestTimeout(value))?,
            )),
            Err(env::VarError::NotPresent) => None,
            Err(env::VarError::NotUnicode(_)) => return Err(ConfigError::NotUnicode("REQUEST_TIMEOUT")),
        };

        Ok(Self {
            host,
            port,
            request_timeout,
        })
    }

    /// The base URI this configuration resolves to, e.g. `http://127.0.0.1:7000`.
    pub fn base_uri(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn parse_host_port(value: &str) -> Result<(String, u16), ConfigError> {
    let (host, port) = value
        .rsplit_once(':')
        .ok_or_else(|| ConfigError::InvalidRuntimeApi(value.to_string()))?;
    let port = port
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidRuntimeApi(value.to_string()))?;
    Ok((host.to_string(), port))
}

/// Why [`RuntimeConfig::from_env`] failed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `AWS_LAMBDA_RUNTIME_API` was not in `host:port` form.
    #[error("AWS_LAMBDA_RUNTIME_API is not in host:port form: {0:?}")]
    InvalidRuntimeApi(String),
    /// `REQUEST_TIMEOUT` was set but not a valid integer.
    #[error("REQUEST_TIMEOUT is not an integer number of milliseconds: {0:?}")]
    InvalidRequestTimeout(String),
    /// An environment variable contained non-UTF-8 bytes.
    #[error("{0} is not valid unicode")]
    NotUnicode(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.base_uri(), "http://127.0.0.1:7000");
        assert_eq!(cfg.request_timeout, None);
    }

    #[test]
    fn parses_host_port() {
        assert_eq!(
            parse_host_port("169.254.100.1:9001").unwrap(),
            ("169.254.100.1".to_string(), 9001)
        );
    }

    #[test]
    fn rejects_missing_port() {
        assert!(parse_host_port("169.254.100.1").is_err());
    }

    #[test]
    fn rejects_non_numeric_port() {
        assert!(parse_host_port("169.254.100.1:abc").is_err());
    }
}
