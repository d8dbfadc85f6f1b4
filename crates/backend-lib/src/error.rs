// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::session::SessionError;
use crate::storage::StoreError;
use crate::validation::ValidationError;

/// Failures surfaced at the handler boundary
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Unsupported media type")]
    UnsupportedMediaType,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Too many failed sign-in attempts")]
    TooManyAttempts,

    #[error("Store write failed: {0}")]
    StoreWrite(String),

    #[error("Store read failed: {0}")]
    StoreRead(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidJson(_) | AppError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            },
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::InvalidCredentials | AppError::Unauthenticated(_) => {
                StatusCode::UNAUTHORIZED
            },
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            AppError::StoreWrite(_) | AppError::StoreRead(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VAL_001",
            AppError::InvalidJson(_) => "VAL_002",
            AppError::MethodNotAllowed => "REQ_001",
            AppError::UnsupportedMediaType => "REQ_002",
            AppError::Conflict(_) => "USER_001",
            AppError::InvalidCredentials => "AUTH_001",
            AppError::Unauthenticated(_) => "AUTH_002",
            AppError::Forbidden(_) => "AUTH_003",
            AppError::TooManyAttempts => "AUTH_004",
            AppError::NotFound(_) => "NF_001",
            AppError::StoreWrite(_) => "STORE_001",
            AppError::StoreRead(_) => "STORE_002",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Message safe to show a client.
    ///
    /// Validation and conflict messages describe the caller's own input and
    /// are passed through. Everything touching sessions, signatures or the
    /// stores collapses to a fixed phrase.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(e) => e.to_string(),
            AppError::InvalidJson(_) => "invalid JSON in request body".to_string(),
            AppError::MethodNotAllowed => "method not allowed".to_string(),
            AppError::UnsupportedMediaType => "request body must be JSON".to_string(),
            AppError::Conflict(msg) => msg.clone(),
            AppError::InvalidCredentials => "invalid credentials".to_string(),
            AppError::Unauthenticated(_) => "no valid session".to_string(),
            AppError::Forbidden(_) => "not allowed to act on this resource".to_string(),
            AppError::NotFound(_) => "resource not found".to_string(),
            AppError::TooManyAttempts => {
                "too many failed sign-in attempts, please try again later".to_string()
            },
            AppError::StoreWrite(_) | AppError::StoreRead(_) | AppError::Internal(_) => {
                "internal server error".to_string()
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.error_code(), error = %self, "request rejected");
        }

        (status, self.public_message()).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound("no such record".to_string()),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Write(msg) => AppError::StoreWrite(msg),
            StoreError::Read(msg) => AppError::StoreRead(msg),
            StoreError::Serialization(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Unauthenticated(reason) => AppError::Unauthenticated(reason),
            SessionError::StoreWrite(msg) => AppError::StoreWrite(msg),
            SessionError::State(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("blocking task failed: {err}"))
    }
}
