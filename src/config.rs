//! Server configuration.
//!
//! Loaded from TOML or from the environment; every field has a default, so an
//! empty source is a valid configuration.
//!
//! ```toml
//! addr = "127.0.0.1:8080"
//! expose_errors = false
//! timeout_ms = 5000
//! ```
//!
//! | Variable              | Field           |
//! |-----------------------|-----------------|
//! | `SKEIN_ADDR`          | `addr`          |
//! | `SKEIN_EXPOSE_ERRORS` | `expose_errors` |
//! | `SKEIN_TIMEOUT_MS`    | `timeout_ms`    |

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::translate::ErrorDetail;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value `{value}` for {var}")]
    Env { var: &'static str, value: String },
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address the server binds to.
    pub addr: SocketAddr,
    /// Send internal error messages to clients.
    pub expose_errors: bool,
    /// Per-request deadline. Unset means no deadline.
    pub timeout_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            expose_errors: true,
            timeout_ms: None,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// Defaults overridden by `SKEIN_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Defaults overridden by the given `SKEIN_*` variables.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            let value = value.into();
            match key.as_ref() {
                "SKEIN_ADDR" => config.addr = parse("SKEIN_ADDR", value)?,
                "SKEIN_EXPOSE_ERRORS" => config.expose_errors = parse("SKEIN_EXPOSE_ERRORS", value)?,
                "SKEIN_TIMEOUT_MS" => config.timeout_ms = Some(parse("SKEIN_TIMEOUT_MS", value)?),
                _ => {}
            }
        }
        Ok(config)
    }

    pub fn error_detail(&self) -> ErrorDetail {
        if self.expose_errors { ErrorDetail::Expose } else { ErrorDetail::Redact }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_the_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn toml_overrides_fields() {
        let config = Config::from_toml(
            r#"
            addr = "127.0.0.1:8080"
            expose_errors = false
            timeout_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.error_detail(), ErrorDetail::Redact);
        assert_eq!(config.timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn unknown_toml_keys_are_rejected() {
        assert!(matches!(Config::from_toml("port = 1"), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn env_vars_override_defaults() {
        let config = Config::from_vars([
            ("SKEIN_ADDR", "127.0.0.1:9000"),
            ("SKEIN_TIMEOUT_MS", "1000"),
            ("UNRELATED", "x"),
        ])
        .unwrap();
        assert_eq!(config.addr.port(), 9000);
        assert_eq!(config.timeout(), Some(Duration::from_secs(1)));
        assert!(config.expose_errors);
    }

    #[test]
    fn bad_env_values_name_the_variable() {
        let err = Config::from_vars([("SKEIN_EXPOSE_ERRORS", "maybe")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid value `maybe` for SKEIN_EXPOSE_ERRORS");
    }
}
