//! Runtime settings loaded from the environment.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use config::{Config, Environment};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tally_cache::{Cache, DisabledStore, KvStore, MemoryStore, RedisStore, StoreConfig};
use tracing::{info, warn};

/// Errors raised while loading settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Which store backs the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Redis,
    Memory,
    Disabled,
}

/// HTTP server settings (`TALLY_*`).
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cache_backend: CacheBackend,

    /// TTL for read-through entries.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Bounded wait for closing the store connection on shutdown.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cache_ttl_secs() -> u64 {
    tally_cache::DEFAULT_TTL_SECS
}

fn default_shutdown_grace_ms() -> u64 {
    2_000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cache_backend: CacheBackend::default(),
            cache_ttl_secs: default_cache_ttl_secs(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl ServerSettings {
    /// Returns the socket address to bind.
    pub fn addr(&self) -> Result<SocketAddr, SettingsError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| SettingsError::Invalid(format!("address {}:{}: {}", self.host, self.port, e)))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.cache_ttl_secs == 0 {
            return Err(SettingsError::Invalid(
                "TALLY_CACHE_TTL_SECS must be greater than zero".to_string(),
            ));
        }
        self.addr().map(|_| ())
    }
}

/// Complete runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    /// Store configuration, or `None` if it was invalid.
    pub store: Option<StoreConfig>,
}

impl Settings {
    /// Loads `TALLY_*` and `REDIS_*` variables from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_sources(
            Environment::with_prefix("TALLY"),
            Environment::with_prefix("REDIS"),
        )
    }

    /// Loads settings from an explicit variable map instead of the process
    /// environment.
    pub fn from_vars(vars: config::Map<String, String>) -> Result<Self, SettingsError> {
        Self::from_sources(
            Environment::with_prefix("TALLY").source(Some(vars.clone())),
            Environment::with_prefix("REDIS").source(Some(vars)),
        )
    }

    fn from_sources(server: Environment, store: Environment) -> Result<Self, SettingsError> {
        let server: ServerSettings = load(server)?;
        server.validate()?;

        // Un error de configuracion del store solo desactiva la cache
        let store = match load::<StoreConfig>(store).and_then(|config| {
            config
                .validate()
                .map_err(|e| SettingsError::Invalid(e.to_string()))?;
            Ok(config)
        }) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(error = %e, "Invalid store configuration, cache disabled");
                None
            },
        };

        Ok(Self { server, store })
    }

    /// Builds the cache for the configured backend.
    ///
    /// Never fails: anything that prevents a working store yields a cache
    /// over [`DisabledStore`].
    pub fn build_cache(&self) -> Cache {
        let store: Arc<dyn KvStore> = match (self.server.cache_backend, &self.store) {
            (CacheBackend::Disabled, _) => Arc::new(DisabledStore::new("disabled by configuration")),
            (CacheBackend::Memory, _) => Arc::new(MemoryStore::new()),
            (CacheBackend::Redis, None) => Arc::new(DisabledStore::new("invalid store configuration")),
            (CacheBackend::Redis, Some(config)) => match RedisStore::new(config) {
                Ok(store) => {
                    info!(address = %config.address(), db = config.db, "Using Redis cache");
                    Arc::new(store)
                },
                Err(e) => {
                    warn!(error = %e, "Cannot create Redis store, cache disabled");
                    Arc::new(DisabledStore::new(e.to_string()))
                },
            },
        };

        Cache::new(store).with_default_ttl(self.server.cache_ttl_secs)
    }
}

fn load<T: DeserializeOwned>(source: Environment) -> Result<T, SettingsError> {
    Ok(Config::builder()
        .add_source(source.try_parsing(true))
        .build()?
        .try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_cache::ConnectionState;

    fn vars(pairs: &[(&str, &str)]) -> config::Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_from_empty_environment() {
        let settings = Settings::from_vars(vars(&[])).unwrap();

        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.cache_backend, CacheBackend::Redis);
        assert_eq!(settings.server.cache_ttl_secs, 3600);
        assert_eq!(settings.store, Some(StoreConfig::default()));
    }

    #[test]
    fn test_reads_prefixed_variables() {
        let settings = Settings::from_vars(vars(&[
            ("TALLY_PORT", "9000"),
            ("TALLY_CACHE_BACKEND", "memory"),
            ("TALLY_CACHE_TTL_SECS", "120"),
            ("REDIS_HOST", "cache.internal"),
            ("REDIS_PORT", "6380"),
            ("REDIS_PASSWORD", "s3cret"),
            ("REDIS_DB", "4"),
            ("REDIS_CONNECT_TIMEOUT_MS", "250"),
            ("REDIS_MAX_RETRIES_PER_REQUEST", "1"),
        ]))
        .unwrap();

        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.cache_backend, CacheBackend::Memory);
        assert_eq!(settings.server.cache_ttl_secs, 120);

        let store = settings.store.unwrap();
        assert_eq!(store.host, "cache.internal");
        assert_eq!(store.port, 6380);
        assert_eq!(store.password.as_deref(), Some("s3cret"));
        assert_eq!(store.db, 4);
        assert_eq!(store.connect_timeout_ms, 250);
        assert_eq!(store.max_retries_per_request, 1);
    }

    #[test]
    fn test_invalid_store_config_disables_cache() {
        let settings = Settings::from_vars(vars(&[("REDIS_PORT", "not-a-port")])).unwrap();
        assert!(settings.store.is_none());

        let cache = settings.build_cache();
        assert_eq!(cache.backend(), "disabled");
        assert_eq!(cache.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_invalid_server_config_is_an_error() {
        assert!(Settings::from_vars(vars(&[("TALLY_CACHE_TTL_SECS", "0")])).is_err());
        assert!(Settings::from_vars(vars(&[("TALLY_HOST", "not an ip")])).is_err());
    }

    #[tokio::test]
    async fn test_build_cache_per_backend() {
        let memory = Settings::from_vars(vars(&[("TALLY_CACHE_BACKEND", "memory")])).unwrap();
        assert_eq!(memory.build_cache().backend(), "memory");

        let disabled = Settings::from_vars(vars(&[("TALLY_CACHE_BACKEND", "disabled")])).unwrap();
        assert_eq!(disabled.build_cache().backend(), "disabled");

        let redis = Settings::from_vars(vars(&[])).unwrap().build_cache();
        assert_eq!(redis.backend(), "redis");
        assert_eq!(redis.state(), ConnectionState::Disconnected);
        assert_eq!(redis.default_ttl(), Duration::from_secs(3600));
    }
}
