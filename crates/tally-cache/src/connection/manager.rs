//! Lazy, budgeted store connection management.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

use super::{ConnectionEvent, ConnectionLifecycle, ConnectionState, RetryPolicy, Transition};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::metrics::CacheMetrics;

/// Opens and closes connections to a store.
///
/// # Implementors
///
/// - `RedisConnector` - multiplexed Redis connections over TCP
/// - test fakes that fail or succeed on demand
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// A cheaply cloneable handle usable by concurrent commands.
    type Connection: Clone + Send + Sync + 'static;

    /// Opens a new connection.
    async fn connect(&self) -> Result<Self::Connection, StoreError>;

    /// Closes a connection, flushing whatever the protocol allows.
    ///
    /// The default implementation just drops the handle.
    async fn close(&self, _connection: Self::Connection) -> Result<(), StoreError> {
        Ok(())
    }

    /// Returns a name for logging.
    fn name(&self) -> &str;
}

/// Owns the store connection and its lifecycle.
///
/// The connection is opened on first use. A failed attempt is retried with the
/// [`RetryPolicy`] backoff by the caller that started it; callers arriving
/// while an attempt is in flight fail immediately instead of queueing behind
/// it. Once the budget is exhausted every call fails without touching the
/// network.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    lifecycle: ConnectionLifecycle,
    /// Current connection tagged with a generation, so a failure observed on an
    /// old handle cannot tear down a newer one.
    current: RwLock<Option<(u64, C::Connection)>>,
    generation: AtomicU64,
    connect_gate: Mutex<()>,
    connect_timeout: Duration,
    command_timeout: Duration,
    max_retries_per_request: u32,
    metrics: CacheMetrics,
}

impl<C: Connector> ConnectionManager<C> {
    /// Creates a manager with the given connector and retry policy, using the
    /// timeouts of [`StoreConfig::default`].
    pub fn new(connector: C, policy: RetryPolicy) -> Self {
        let defaults = StoreConfig::default();
        Self {
            connector,
            lifecycle: ConnectionLifecycle::new(policy),
            current: RwLock::new(None),
            generation: AtomicU64::new(0),
            connect_gate: Mutex::new(()),
            connect_timeout: defaults.connect_timeout(),
            command_timeout: defaults.command_timeout(),
            max_retries_per_request: defaults.max_retries_per_request,
            metrics: CacheMetrics::new(),
        }
    }

    /// Creates a manager configured from a [`StoreConfig`].
    pub fn from_config(connector: C, config: &StoreConfig) -> Self {
        Self::new(connector, RetryPolicy::default())
            .with_timeouts(config.connect_timeout(), config.command_timeout())
            .with_max_retries_per_request(config.max_retries_per_request)
    }

    /// Sets the connect and per-command timeouts.
    pub fn with_timeouts(mut self, connect: Duration, command: Duration) -> Self {
        self.connect_timeout = connect;
        self.command_timeout = command;
        self
    }

    /// Sets how often a command is retried after its connection drops.
    pub fn with_max_retries_per_request(mut self, retries: u32) -> Self {
        self.max_retries_per_request = retries;
        self
    }

    /// Returns the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.lifecycle.state()
    }

    /// Returns the lifecycle for inspection.
    pub fn lifecycle(&self) -> &ConnectionLifecycle {
        &self.lifecycle
    }

    /// Returns the connector.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    fn apply(&self, event: ConnectionEvent) -> Transition {
        let transition = self.lifecycle.handle(event);
        self.metrics.record_state(transition.to);
        transition
    }

    fn exhausted(&self) -> StoreError {
        StoreError::unavailable(format!(
            "{} retry budget exhausted after {} attempts",
            self.connector.name(),
            self.lifecycle.failed_attempts()
        ))
    }

    /// Returns a usable connection, connecting lazily.
    pub async fn connection(&self) -> Result<C::Connection, StoreError> {
        self.checkout().await.map(|(_, conn)| conn)
    }

    async fn checkout(&self) -> Result<(u64, C::Connection), StoreError> {
        let current = self.current.read().clone();
        if let Some(entry) = current {
            return Ok(entry);
        }

        if self.state() == ConnectionState::Failed {
            return Err(self.exhausted());
        }

        let Ok(_gate) = self.connect_gate.try_lock() else {
            return Err(StoreError::unavailable(format!(
                "{} connection attempt in progress",
                self.connector.name()
            )));
        };

        // Otro caller pudo haber conectado mientras esperabamos
        let current = self.current.read().clone();
        if let Some(entry) = current {
            return Ok(entry);
        }

        loop {
            if self.state() == ConnectionState::Failed {
                return Err(self.exhausted());
            }

            self.apply(ConnectionEvent::Connect);

            let outcome = match timeout(self.connect_timeout, self.connector.connect()).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::timeout(self.connect_timeout)),
            };

            match outcome {
                Ok(conn) => {
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
                    *self.current.write() = Some((generation, conn.clone()));
                    self.apply(ConnectionEvent::Ready);
                    return Ok((generation, conn));
                },
                Err(err) => {
                    let transition = self.apply(ConnectionEvent::Error(err.to_string()));
                    match transition.retry_in {
                        Some(delay) => sleep(delay).await,
                        None => return Err(self.exhausted()),
                    }
                },
            }
        }
    }

    /// Drops the connection with the given generation after a connection-class
    /// failure.
    fn discard(&self, generation: u64, err: &StoreError) {
        let removed = {
            let mut current = self.current.write();
            match current.as_ref() {
                Some((live, _)) if *live == generation => current.take().is_some(),
                _ => false,
            }
        };

        if removed {
            self.apply(ConnectionEvent::Error(err.to_string()));
        }
    }

    /// Runs one command with the per-command timeout.
    ///
    /// Connection-class failures drop the connection and retry the command up
    /// to `max_retries_per_request` times through the budgeted reconnect
    /// path. Other failures are returned as-is.
    pub async fn execute<T, F, Fut>(&self, operation: &'static str, f: F) -> Result<T, StoreError>
    where
        F: Fn(C::Connection) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut retries = 0;

        loop {
            let (generation, conn) = self.checkout().await?;

            let result = match timeout(self.command_timeout, f(conn)).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::timeout(self.command_timeout)),
            };

            match result {
                Err(err) if err.is_connection() => {
                    self.discard(generation, &err);
                    if retries >= self.max_retries_per_request {
                        return Err(err);
                    }
                    retries += 1;
                    debug!(operation, retries, error = %err, "Retrying store command");
                },
                other => return other,
            }
        }
    }

    /// Closes the connection if it is ready, waiting at most `grace`.
    ///
    /// Errors are swallowed: this runs while the process is exiting.
    pub async fn shutdown(&self, grace: Duration) {
        let taken = self.current.write().take();

        if let Some((_, conn)) = taken {
            if self.state() == ConnectionState::Ready {
                match timeout(grace, self.connector.close(conn)).await {
                    Ok(Ok(())) => info!(store = self.connector.name(), "Store connection closed"),
                    Ok(Err(e)) => debug!(error = %e, "Ignoring error while closing store connection"),
                    Err(_) => debug!(
                        grace_ms = grace.as_millis() as u64,
                        "Store connection close timed out"
                    ),
                }
            }
        }

        self.apply(ConnectionEvent::Closed);
    }
}
