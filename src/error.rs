//! API error type
//!
//! Every handler failure ends up here and is rendered as
//! `{"success": false, "message": ...}` with the matching status code.
//! Internal causes are logged and never echoed back to the caller.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::auth::jwt::TokenError;
use crate::auth::password::PasswordError;
use crate::database::StoreError;
use crate::database::models::{NewAdminError, ValidationError};
use crate::services::UploadError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("upload failed: {0}")]
    UploadFailed(#[from] UploadError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UploadFailed(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Validation(msg)
            | ApiError::Conflict(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg) => msg.clone(),
            ApiError::UploadFailed(_) => "One or more images failed to upload.".to_string(),
            ApiError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(e) => tracing::error!("Internal error: {:#}", e),
            ApiError::UploadFailed(e) => tracing::error!("Upload failed: {}", e),
            other => tracing::debug!("Request rejected: {}", other),
        }

        let body = json!({
            "success": false,
            "message": self.public_message(),
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Validation(e.0)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateKey => ApiError::Conflict("Admin already exists".to_string()),
            StoreError::Validation(msg) => ApiError::Validation(msg),
            StoreError::Backend(e) => ApiError::Internal(e),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::InvalidOrExpired => ApiError::unauthorized("Invalid or expired token"),
            TokenError::Encode(e) => ApiError::Internal(anyhow::Error::new(e).context("Failed to issue token")),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        ApiError::Internal(anyhow::Error::new(e))
    }
}

impl From<NewAdminError> for ApiError {
    fn from(e: NewAdminError) -> Self {
        match e {
            NewAdminError::Validation(v) => v.into(),
            NewAdminError::Password(p) => p.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}
