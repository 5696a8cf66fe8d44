//! Store connection configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Configuration for the Redis store.
///
/// Every field has a default so an empty environment still yields a usable
/// configuration; if the store turns out to be unreachable the cache simply
/// stays cold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Store host name or address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Store TCP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Password (optional).
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Logical database index.
    #[serde(default)]
    pub db: i64,

    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Per-command timeout in milliseconds.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// How many times a single command is retried after the connection drops.
    #[serde(default = "default_max_retries_per_request")]
    pub max_retries_per_request: u32,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    6379
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_command_timeout_ms() -> u64 {
    5_000
}

fn default_max_retries_per_request() -> u32 {
    3
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            password: None,
            db: 0,
            connect_timeout_ms: default_connect_timeout_ms(),
            command_timeout_ms: default_command_timeout_ms(),
            max_retries_per_request: default_max_retries_per_request(),
        }
    }
}

impl StoreConfig {
    /// Returns the connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the per-command timeout.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Checks the values that would make every connection attempt fail.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.host.trim().is_empty() {
            return Err(StoreError::InvalidConfig("host cannot be empty".to_string()));
        }
        if self.port == 0 {
            return Err(StoreError::InvalidConfig("port cannot be 0".to_string()));
        }
        if self.db < 0 {
            return Err(StoreError::InvalidConfig(format!(
                "database index cannot be negative: {}",
                self.db
            )));
        }
        if self.connect_timeout_ms == 0 || self.command_timeout_ms == 0 {
            return Err(StoreError::InvalidConfig(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the `redis://` connection URL, percent-encoding the password.
    pub fn connection_url(&self) -> String {
        match self.password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                urlencoding::encode(password),
                self.host,
                self.port,
                self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }

    /// Returns `host:port` for logging (never includes the password).
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_config_default() {
        let config = StoreConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 6379);
        assert_eq!(config.db, 0);
        assert!(config.password.is_none());
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.command_timeout(), Duration::from_secs(5));
        assert_eq!(config.max_retries_per_request, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_connection_url() {
        let mut config = StoreConfig::default();
        assert_eq!(config.connection_url(), "redis://127.0.0.1:6379/0");

        config.password = Some("p@ss:word".to_string());
        config.db = 2;
        assert_eq!(
            config.connection_url(),
            "redis://:p%40ss%3Aword@127.0.0.1:6379/2"
        );

        // Una password vacia equivale a no tener password
        config.password = Some(String::new());
        assert_eq!(config.connection_url(), "redis://127.0.0.1:6379/2");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = StoreConfig {
            host: "  ".to_string(),
            ..StoreConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidConfig(_))
        ));

        let config = StoreConfig {
            port: 0,
            ..StoreConfig::default()
        };
        assert!(config.validate().is_err());

        let config = StoreConfig {
            db: -1,
            ..StoreConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"host": "cache.internal", "db": 3}"#).unwrap();
        assert_eq!(config.host, "cache.internal");
        assert_eq!(config.db, 3);
        assert_eq!(config.port, 6379);
        assert_eq!(config.max_retries_per_request, 3);
    }

    #[test]
    fn test_password_not_serialized() {
        let config = StoreConfig {
            password: Some("secret".to_string()),
            ..StoreConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
