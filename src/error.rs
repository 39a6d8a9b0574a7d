//! Error types for the Drive Relay server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::credentials::CredentialError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Unauthorized: {0}")]
    Auth(String),

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("Backend did not respond within {after_secs} seconds")]
    Timeout { after_secs: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            message: message.into(),
        }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::BAD_REQUEST,
            AppError::Backend { status, .. } => match StatusCode::from_u16(*status) {
                Ok(code) if code.is_client_error() => code,
                _ => StatusCode::BAD_GATEWAY,
            },
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Auth(_) => "AUTH_ERROR",
            AppError::NotFound(_) => "SESSION_NOT_FOUND",
            AppError::Backend { .. } => "BACKEND_ERROR",
            AppError::Timeout { .. } => "TIMEOUT",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        AppError::Auth(err.to_string())
    }
}

/// Error response body
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    backend_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retryable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (message, field, backend_status, retryable) = match &self {
            AppError::Validation { field, .. } => (self.to_string(), Some(*field), None, None),
            AppError::Auth(msg) => {
                tracing::warn!("Auth failure: {}", msg);
                ("Unauthorized".to_string(), None, None, None)
            }
            AppError::NotFound(_) => (self.to_string(), None, None, None),
            AppError::Backend { status, body } => {
                tracing::error!(backend_status = status, body = %body, "Backend error");
                (
                    format!("Storage backend rejected the request ({})", status),
                    None,
                    Some(*status),
                    None,
                )
            }
            AppError::Timeout { .. } => {
                tracing::warn!("{}", self);
                (self.to_string(), None, None, Some(true))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("An internal error occurred".to_string(), None, None, None)
            }
        };

        let body = Json(ErrorResponse {
            error: self.code(),
            message,
            field,
            backend_status,
            retryable,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
