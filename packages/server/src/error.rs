use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `USER_NOT_FOUND`, `INVALID_CREDENTIALS`, `PERMISSION_DENIED`,
    /// `NOT_FOUND`, `EMAIL_TAKEN`, `ADMIN_EXISTS`, `EVENT_FULL`, `ALREADY_REGISTERED`,
    /// `INTERNAL_ERROR`.
    #[schema(example = "EVENT_FULL")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Event is fully booked")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    /// Token verified but its subject is gone from the store.
    UserNotFound,
    InvalidCredentials,
    AdminRequired,
    Forbidden(String),
    NotFound(String),
    EmailTaken,
    AdminExists,
    EventFull,
    AlreadyRegistered,
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        let (status, code, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_MISSING",
                "Authentication required".into(),
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_INVALID",
                "Invalid or expired token".into(),
            ),
            AppError::UserNotFound => (
                StatusCode::UNAUTHORIZED,
                "USER_NOT_FOUND",
                "User not found".into(),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid credentials".into(),
            ),
            AppError::AdminRequired => (
                StatusCode::FORBIDDEN,
                "PERMISSION_DENIED",
                "Admin rights required".into(),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "PERMISSION_DENIED", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::EmailTaken => (
                StatusCode::BAD_REQUEST,
                "EMAIL_TAKEN",
                "Email is already registered".into(),
            ),
            AppError::AdminExists => (
                StatusCode::BAD_REQUEST,
                "ADMIN_EXISTS",
                "An admin account already exists".into(),
            ),
            AppError::EventFull => (
                StatusCode::BAD_REQUEST,
                "EVENT_FULL",
                "Event is fully booked".into(),
            ),
            AppError::AlreadyRegistered => (
                StatusCode::BAD_REQUEST,
                "ALREADY_REGISTERED",
                "Already registered for this event".into(),
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred".into(),
                )
            }
        };
        (status, ErrorBody { code, message })
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
