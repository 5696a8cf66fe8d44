use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::source::SourceError;

/// Errors returned by HTTP handlers.
///
/// Cache failures never appear here; only the system of record can fail a
/// request.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Documento no encontrado
    #[error("{0} not found")]
    NotFound(String),

    /// Parametros invalidos
    #[error("{0}")]
    BadRequest(String),

    /// Error interno
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }
}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Rejected(msg) => Self::BadRequest(msg),
            SourceError::Unavailable(_) => Self::Internal(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}
