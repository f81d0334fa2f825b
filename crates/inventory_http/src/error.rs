//! HTTP error mapping.
//!
//! # Invariants
//! - Storage and data-corruption details are logged, never returned.
//! - Every variant maps to exactly one status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use inventory_core::RepoError;
use log::{error, info, warn};
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing/invalid fields or an unreadable request body.
    #[error("{message}")]
    Validation { message: String },

    #[error("{kind} with ID {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{message}")]
    Conflict { message: String },

    /// Failure inside the repository.
    #[error(transparent)]
    Repository(RepoError),

    #[error("failed to {operation}")]
    Internal { operation: String },
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation {
                message: err.to_string(),
            },
            RepoError::NotFound { kind, id } => Self::NotFound { kind, id },
            err @ RepoError::Conflict { .. } => Self::Conflict {
                message: err.to_string(),
            },
            err @ (RepoError::Storage(_) | RepoError::InvalidData(_)) => Self::Repository(err),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Repository(_) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { .. } | Self::NotFound { .. } | Self::Conflict { .. } => {
                self.to_string()
            }
            Self::Repository(_) | Self::Internal { .. } => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::Repository(_) | Self::Internal { .. } => {
                error!(
                    "event=http_error module=http status={} error={}",
                    status.as_u16(),
                    self
                );
            }
            Self::Conflict { .. } => {
                warn!(
                    "event=http_error module=http status={} error={}",
                    status.as_u16(),
                    self
                );
            }
            Self::Validation { .. } | Self::NotFound { .. } => {
                info!(
                    "event=http_error module=http status={} error={}",
                    status.as_u16(),
                    self
                );
            }
        }

        (status, Json(json!({ "error": self.user_message() }))).into_response()
    }
}
