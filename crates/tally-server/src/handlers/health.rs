use axum::{Json, extract::State};
use serde::Serialize;
use tally_cache::Cache;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub cache: CacheHealth,
}

/// Cache block of the health report. Informational only: a degraded cache
/// never turns the status DOWN.
#[derive(Debug, Serialize)]
pub struct CacheHealth {
    pub backend: String,
    pub state: String,
}

impl HealthResponse {
    pub fn from_cache(cache: &Cache) -> Self {
        Self {
            status: "UP".to_string(),
            cache: CacheHealth {
                backend: cache.backend().to_string(),
                state: cache.state().to_string(),
            },
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::from_cache(state.cache()))
}
