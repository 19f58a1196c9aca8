use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    storage::StorageError,
    validation::{Issue, ValidationError},
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    issues: Vec<Issue>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let issues = match &self {
            ApiError::Validation(e) => {
                tracing::warn!(error = %e, "Rejected request");
                e.issues.clone()
            }
            _ if status.is_server_error() => {
                tracing::error!(error = %self, "Request failed");
                Vec::new()
            }
            _ => Vec::new(),
        };

        (status, Json(ErrorBody {
            success: false,
            error: self.to_string(),
            issues,
        })).into_response()
    }
}
