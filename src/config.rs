//! Broker connection settings.
//!
//! Values are read once, from the process environment or any key/value
//! source, and passed around explicitly afterwards.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BROKER_PORT: &str = "FGRZL_BROKER_PORT";
pub const BROKER_USE_TLS: &str = "FGRZL_BROKER_USE_TLS";
pub const TLS_CERT_PATH: &str = "FGRZL_TLS_CERT_PATH";
pub const TLS_KEY_PATH: &str = "FGRZL_TLS_KEY_PATH";
pub const BROKER_INTERNAL_USERNAME: &str = "FGRZL_BROKER_INTERNAL_USERNAME";
pub const BROKER_INTERNAL_PASSWORD: &str = "FGRZL_BROKER_INTERNAL_PASSWORD";
pub const CLIENT_POOLS: &str = "FGRZL_CLIENT_POOLS";
pub const WEB_PORT: &str = "FGRZL_WEB_PORT";
pub const WEB_USE_TLS: &str = "FGRZL_WEB_USE_TLS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid port in {var}: {value:?}")]
    InvalidPort { var: &'static str, value: String },
    #[error("TLS enabled but {0} is not set")]
    MissingTlsPath(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub port: u16,
    pub use_tls: bool,
    pub cert_path: String,
    pub key_path: String,
    pub internal_username: String,
    pub internal_password: String,
    pub client_pools: Vec<String>,
    pub web_port: u16,
    pub web_use_tls: bool,
}

impl BrokerConfig {
    /// Read every `FGRZL_*` variable from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Build from any key/value source. Unknown keys are ignored and
    /// missing keys keep their defaults.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::default();

        for (key, value) in vars {
            let value: String = value.into();
            match key.as_ref() {
                BROKER_PORT => config.port = parse_port(BROKER_PORT, &value)?,
                BROKER_USE_TLS => config.use_tls = value == "true",
                TLS_CERT_PATH => config.cert_path = value,
                TLS_KEY_PATH => config.key_path = value,
                BROKER_INTERNAL_USERNAME => config.internal_username = value,
                BROKER_INTERNAL_PASSWORD => config.internal_password = value,
                CLIENT_POOLS => {
                    config.client_pools = value
                        .split(',')
                        .map(str::trim)
                        .filter(|pool| !pool.is_empty())
                        .map(String::from)
                        .collect()
                }
                WEB_PORT => config.web_port = parse_port(WEB_PORT, &value)?,
                WEB_USE_TLS => config.web_use_tls = value == "true",
                _ => {}
            }
        }

        tracing::debug!(
            port = config.port,
            use_tls = config.use_tls,
            client_pools = config.client_pools.len(),
            "loaded broker config"
        );

        Ok(config)
    }

    /// URL clients use to reach the broker, e.g. `ws://localhost:4222`.
    pub fn broker_connection(&self) -> String {
        let scheme = if self.use_tls { "wss" } else { "ws" };
        format!("{}://localhost:{}", scheme, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.use_tls {
            if self.cert_path.is_empty() {
                return Err(ConfigError::MissingTlsPath(TLS_CERT_PATH));
            }
            if self.key_path.is_empty() {
                return Err(ConfigError::MissingTlsPath(TLS_KEY_PATH));
            }
        }
        Ok(())
    }
}

// An empty value means unset.
fn parse_port(var: &'static str, value: &str) -> Result<u16, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0);
    }
    value.parse().map_err(|_| ConfigError::InvalidPort {
        var,
        value: value.to_string(),
    })
}
