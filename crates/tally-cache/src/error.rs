//! Error types for key-value store access.
//!
//! These errors never cross the [`Cache`](crate::Cache) boundary: the adapter
//! logs them and degrades to a miss. They exist so stores and the connection
//! manager can tell connectivity problems apart from command problems.

/// Errors that can occur when talking to a key-value store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The connection could not be established or was lost.
    #[error("store connection failed: {0}")]
    Connection(String),

    /// The store rejected or failed a command on a healthy connection.
    #[error("store command failed: {0}")]
    Command(String),

    /// The operation did not complete in time.
    #[error("operation timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// The store is not usable (retry budget exhausted, disabled, shut down).
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    /// The store configuration is invalid.
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    /// Creates a new connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a new command error.
    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    /// Creates a new unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Creates a timeout error from a duration.
    pub fn timeout(after: std::time::Duration) -> Self {
        Self::Timeout {
            millis: after.as_millis() as u64,
        }
    }

    /// Returns true if the error means the connection itself is unhealthy
    /// and should be re-established before the next command.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout { .. })
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            Self::Connection(err.to_string())
        } else {
            Self::Command(err.to_string())
        }
    }
}
