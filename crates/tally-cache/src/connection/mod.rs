//! Store connection lifecycle.
//!
//! This module owns the connection state machine, the retry budget that
//! bounds reconnect attempts, and the manager that lazily opens, reuses and
//! closes the store connection.

mod manager;
mod retry;
mod state;

pub use manager::{ConnectionManager, Connector};
pub use retry::{RetryBudget, RetryPolicy};
pub use state::{ConnectionEvent, ConnectionLifecycle, ConnectionState, Transition};
