//! Redis-backed store.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tracing::debug;

use super::KvStore;
use crate::config::StoreConfig;
use crate::connection::{ConnectionManager, ConnectionState, Connector};
use crate::error::StoreError;

/// Keys requested per SCAN round trip.
const SCAN_BATCH: usize = 500;

/// Opens multiplexed Redis connections.
pub struct RedisConnector {
    client: redis::Client,
    address: String,
}

impl RedisConnector {
    /// Creates a connector from a validated configuration.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let client = redis::Client::open(config.connection_url())
            .map_err(|e| StoreError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            address: config.address(),
        })
    }

    /// Returns `host:port` of the target server.
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl Connector for RedisConnector {
    type Connection = MultiplexedConnection;

    async fn connect(&self) -> Result<MultiplexedConnection, StoreError> {
        debug!(address = %self.address, "Opening Redis connection");
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // Verifica AUTH/SELECT antes de declarar la conexion lista
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(conn)
    }

    async fn close(&self, mut connection: MultiplexedConnection) -> Result<(), StoreError> {
        let _: () = redis::cmd("QUIT").query_async(&mut connection).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "redis"
    }
}

/// Redis store over a lazily managed connection.
///
/// Construction never touches the network; the first command connects.
pub struct RedisStore {
    manager: ConnectionManager<RedisConnector>,
}

impl RedisStore {
    /// Creates a store from configuration.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidConfig` if the configuration cannot
    /// describe a reachable server.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let connector = RedisConnector::new(config)?;
        Ok(Self {
            manager: ConnectionManager::from_config(connector, config),
        })
    }

    /// Returns the connection manager.
    pub fn manager(&self) -> &ConnectionManager<RedisConnector> {
        &self.manager
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.manager
            .execute("get", |mut conn| async move {
                let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
                Ok::<_, StoreError>(value)
            })
            .await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let seconds = ttl.as_secs().max(1);
        self.manager
            .execute("set", |mut conn| async move {
                let _: () = redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("EX")
                    .arg(seconds)
                    .query_async(&mut conn)
                    .await?;
                Ok::<_, StoreError>(())
            })
            .await
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, StoreError> {
        if keys.is_empty() {
            return Ok(0);
        }

        self.manager
            .execute("delete", |mut conn| async move {
                let removed: u64 = redis::cmd("DEL").arg(keys).query_async(&mut conn).await?;
                Ok::<_, StoreError>(removed)
            })
            .await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        self.manager
            .execute("keys", |mut conn| async move {
                // SCAN puede devolver la misma key mas de una vez
                let mut found = BTreeSet::new();
                let mut cursor: u64 = 0;
                loop {
                    let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut conn)
                        .await?;
                    found.extend(batch);
                    if next == 0 {
                        break;
                    }
                    cursor = next;
                }
                Ok::<_, StoreError>(found.into_iter().collect())
            })
            .await
    }

    fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    async fn shutdown(&self, grace: Duration) {
        self.manager.shutdown(grace).await;
    }

    fn name(&self) -> &str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_does_not_connect() {
        let config = StoreConfig {
            host: "cache.invalid".to_string(),
            ..StoreConfig::default()
        };
        let store = RedisStore::new(&config).unwrap();

        assert_eq!(store.state(), ConnectionState::Disconnected);
        assert_eq!(store.manager().connector().address(), "cache.invalid:6379");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = StoreConfig {
            port: 0,
            ..StoreConfig::default()
        };
        assert!(matches!(
            RedisStore::new(&config),
            Err(StoreError::InvalidConfig(_))
        ));
    }
}
