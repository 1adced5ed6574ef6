use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::{DomainError, ErrorKind};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("Upstream failure: {0}")]
    BadGateway(String),

    #[error("Deadline exceeded")]
    GatewayTimeout,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<BalanceHint>,
}

/// Attached to insufficient balance responses so clients can offer a top-up.
#[derive(Debug, Serialize)]
pub struct BalanceHint {
    pub required: i64,
    pub available: i64,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut hint = None;
        let (status, error_code, message) = match &self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            ApiError::InsufficientBalance {
                required,
                available,
            } => {
                hint = Some(BalanceHint {
                    required: *required,
                    available: *available,
                });
                (
                    StatusCode::BAD_REQUEST,
                    "insufficient_balance",
                    self.to_string(),
                )
            }
            ApiError::BadGateway(msg) => {
                tracing::warn!("Upstream failure: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_failure",
                    "An upstream provider failed".into(),
                )
            }
            ApiError::GatewayTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "deadline_exceeded",
                "The operation did not finish in time".into(),
            ),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg.clone(),
            ),
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            hint,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        if let DomainError::InsufficientBalance {
            required,
            available,
        } = err
        {
            return ApiError::InsufficientBalance {
                required,
                available,
            };
        }

        match err.kind() {
            ErrorKind::AuthorizationFailure => ApiError::Forbidden(err.to_string()),
            ErrorKind::Precondition => ApiError::Validation(err.to_string()),
            ErrorKind::NotFound => ApiError::NotFound(err.to_string()),
            ErrorKind::Conflict => ApiError::Conflict(err.to_string()),
            ErrorKind::UpstreamFailure => ApiError::BadGateway(err.to_string()),
            ErrorKind::DeadlineExceeded => ApiError::GatewayTimeout,
            ErrorKind::InsufficientBalance | ErrorKind::Internal => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}
