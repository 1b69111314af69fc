use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::media::MediaError;
use sea_orm::DbErr;
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`,
    /// `TOKEN_MISSING`, `TOKEN_INVALID`, `INVALID_CREDENTIALS`,
    /// `EMAIL_NOT_CONFIRMED`, `PERMISSION_DENIED`, `NOT_FOUND`, `CONFLICT`,
    /// `EMAIL_TAKEN`, `ALREADY_RATED`, `TAG_LIMIT_EXCEEDED`, `UPLOAD_ERROR`,
    /// `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Description must be at most 250 characters")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    EmailNotConfirmed,
    PermissionDenied,
    NotFound(String),
    Conflict(String),
    EmailTaken,
    /// The acting user already holds a like on this photo.
    AlreadyRated,
    /// Attaching these tags would push the photo past 5 distinct tags.
    TagLimitExceeded,
    /// The media host rejected an upload or delete.
    Upload(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_MISSING",
                    message: "Authentication required".into(),
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    message: "Invalid or expired token".into(),
                },
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "INVALID_CREDENTIALS",
                    message: "Invalid email or password".into(),
                },
            ),
            AppError::EmailNotConfirmed => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "EMAIL_NOT_CONFIRMED",
                    message: "Email address has not been confirmed".into(),
                },
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "PERMISSION_DENIED",
                    message: "Insufficient permissions".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message: msg,
                },
            ),
            AppError::EmailTaken => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "EMAIL_TAKEN",
                    message: "Account already exists".into(),
                },
            ),
            AppError::AlreadyRated => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "ALREADY_RATED",
                    message: "You have already rated this photo".into(),
                },
            ),
            AppError::TagLimitExceeded => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "TAG_LIMIT_EXCEEDED",
                    message: "A photo can have at most 5 tags".into(),
                },
            ),
            AppError::Upload(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "UPLOAD_ERROR",
                    message: msg,
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::NotFound(id) => {
                tracing::warn!("Media object missing on host: {id}");
                AppError::NotFound("Photo not found on the media host".into())
            }
            MediaError::Unsupported(msg) => AppError::Upload(msg),
            other => {
                tracing::error!("Media host failure: {other}");
                AppError::Upload("Media host request failed".into())
            }
        }
    }
}
