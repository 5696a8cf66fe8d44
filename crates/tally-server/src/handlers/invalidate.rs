//! Cache invalidation endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tally_cache::{Cache, CacheKey};
use tracing::{info, instrument, warn};

use crate::state::AppState;

/// Response para operaciones de invalidación.
#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    /// Patron glob aplicado.
    pub pattern: String,
    /// False si la cache no pudo completar el borrado.
    pub invalidated: bool,
}

#[derive(Debug, Deserialize)]
pub struct CompanyPath {
    pub company: String,
}

/// DELETE /cache
/// Invalida toda la cache.
#[instrument(skip_all)]
pub async fn invalidate_all(State(state): State<AppState>) -> Response {
    invalidate_pattern(state.cache(), "*".to_string()).await
}

/// DELETE /cache/companies/{company}
/// Invalida todas las entries de una empresa.
#[instrument(skip_all, fields(company = %path.company))]
pub async fn invalidate_company(
    State(state): State<AppState>,
    Path(path): Path<CompanyPath>,
) -> Response {
    let pattern = CacheKey::new("company").push(&path.company).pattern();
    invalidate_pattern(state.cache(), pattern).await
}

/// A failed bulk delete is reported as 503 so operators notice; it never
/// affects document requests.
async fn invalidate_pattern(cache: &Cache, pattern: String) -> Response {
    let invalidated = cache.delete_by_pattern(&pattern).await;

    let status = if invalidated {
        info!(pattern = %pattern, "Cache entries invalidated");
        StatusCode::OK
    } else {
        warn!(pattern = %pattern, backend = cache.backend(), "Cache invalidation incomplete");
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(InvalidateResponse {
            pattern,
            invalidated,
        }),
    )
        .into_response()
}
