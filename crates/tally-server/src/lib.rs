//! Tally HTTP server.
//!
//! Serves company documents from a [`RecordSource`](source::RecordSource)
//! through a fail-open [`tally_cache::Cache`]. Reads are read-through with an
//! `x-cache: HIT|MISS` header; writes invalidate the affected keys before the
//! response is sent.

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod settings;
pub mod source;
pub mod state;

pub use error::AppError;
pub use handlers::health::HealthResponse;
pub use server::{create_router_with_state, run_server_with_state};
pub use settings::{CacheBackend, ServerSettings, Settings};
pub use source::{MemoryRecords, Record, RecordId, RecordSource};
pub use state::AppState;
