use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{auth::AuthError, billing::BillingError, offers::OfferError};
use thiserror::Error;
use tracing::error;
use utils::{jwt::JwtError, response::ApiResponse};

/// HTTP-facing error taxonomy. Service errors are folded into one of
/// these variants at the route boundary; the variant alone decides the
/// status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("request failed: {}", self);
        }
        // Internal details stay out of the response body.
        let message = match &self {
            ApiError::Database(_) | ApiError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        (status, Json(ApiResponse::<()>::error(&message))).into_response()
    }
}

impl From<OfferError> for ApiError {
    fn from(err: OfferError) -> Self {
        match err {
            OfferError::Database(e) => ApiError::Database(e),
            OfferError::RequestNotFound | OfferError::OfferNotFound => {
                ApiError::NotFound(err.to_string())
            }
            OfferError::RequestNotActive | OfferError::NotPending => {
                ApiError::Conflict(err.to_string())
            }
            OfferError::AlreadyOffered => ApiError::Conflict(err.to_string()),
            OfferError::QuotaExceeded | OfferError::NotAProvider | OfferError::Forbidden => {
                ApiError::Forbidden(err.to_string())
            }
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::Database(e) => ApiError::Database(e),
            BillingError::UserNotFound => ApiError::NotFound(err.to_string()),
            BillingError::NotAProvider => ApiError::Forbidden(err.to_string()),
            BillingError::InvalidDuration => ApiError::Validation(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Database(e) => ApiError::Database(e),
            AuthError::Validation(msg) => ApiError::Validation(msg),
            AuthError::EmailTaken => ApiError::Conflict(err.to_string()),
            AuthError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            AuthError::Jwt(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}
