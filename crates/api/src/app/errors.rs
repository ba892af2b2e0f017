use axum::extract::multipart::MultipartError;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use petconnect_auth::AuthzError;
use petconnect_core::DomainError;
use petconnect_infra::{MediaError, StoreError};

/// Failures surfaced by request handlers.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Not authorized")]
    Forbidden,

    #[error("{0}")]
    PayloadTooLarge(String),

    /// Store or media failure; the detail is logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidId(msg) => ServiceError::Validation(format!("Invalid id: {msg}")),
            DomainError::NotFound(what) => ServiceError::NotFound(what),
            DomainError::Forbidden => ServiceError::Forbidden,
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(_: AuthzError) -> Self {
        ServiceError::Forbidden
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<MediaError> for ServiceError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Rejected(msg) => ServiceError::Validation(msg),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<MultipartError> for ServiceError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServiceError::PayloadTooLarge(err.body_text())
        } else {
            ServiceError::Validation(err.body_text())
        }
    }
}

/// Extractor rejections carry axum's status and plain-text body; keep the
/// status class and move the text into the JSON error body.
macro_rules! impl_from_rejection {
    ($($rejection:ty),+ $(,)?) => {
        $(
            impl From<$rejection> for ServiceError {
                fn from(err: $rejection) -> Self {
                    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
                        ServiceError::PayloadTooLarge(err.body_text())
                    } else {
                        ServiceError::Validation(err.body_text())
                    }
                }
            }
        )+
    };
}

impl_from_rejection!(JsonRejection, MultipartRejection, QueryRejection, PathRejection);

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
            ServiceError::NotFound(what) => {
                json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
            }
            ServiceError::Forbidden => json_error(StatusCode::FORBIDDEN, "forbidden", "Not authorized"),
            ServiceError::PayloadTooLarge(msg) => {
                json_error(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", msg)
            }
            ServiceError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Server error")
            }
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
