//! Prometheus metrics for the HTTP server.

pub mod http;
pub mod setup;

pub use setup::init_metrics;
