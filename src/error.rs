use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::explain::CompletionError;
use crate::lookup::LookupError;
use crate::scan::ScanError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<LookupError> for AppError {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::NotFound(_) => AppError::NotFound("Product not found".into()),
            LookupError::InvalidBarcode(_) => AppError::BadRequest(e.to_string()),
            LookupError::Upstream(_) | LookupError::Transport(_) => {
                tracing::warn!(error = %e, "product lookup failed");
                AppError::BadGateway("Product database unavailable".into())
            }
        }
    }
}

impl From<ScanError> for AppError {
    fn from(e: ScanError) -> Self {
        match e {
            ScanError::Lookup(e) => e.into(),
            ScanError::Store(e) => AppError::Internal(e),
            ScanError::Capture(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

impl From<CompletionError> for AppError {
    fn from(e: CompletionError) -> Self {
        match e {
            CompletionError::NotConfigured => AppError::Unavailable(e.to_string()),
            CompletionError::EmptyResponse
            | CompletionError::Upstream(_)
            | CompletionError::Transport(_) => {
                tracing::warn!(error = %e, "completion request failed");
                AppError::BadGateway("Failed to fetch information".into())
            }
        }
    }
}
