use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lykk_booking::BookingError;
use lykk_core::ValidationErrors;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Authorization(String),
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Only {available} seats are available, {requested} requested")]
    SeatsUnavailable { requested: u32, available: u32 },
    #[error("{0}")]
    NotCancellable(String),
    #[error("{0}")]
    RateLimited(String),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Authentication(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::Authorization(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Validation failed", "fields": errors.fields() }),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::SeatsUnavailable {
                requested,
                available,
            } => (
                StatusCode::CONFLICT,
                json!({
                    "error": format!("Not enough seats available. Only {} seats are available.", available),
                    "requested": requested,
                    "available": available,
                    "retryable": true,
                }),
            ),
            AppError::NotCancellable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": msg, "retryable": false }),
            ),
            AppError::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, json!({ "error": msg })),
            AppError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation(errors) => AppError::Validation(errors),
            BookingError::SeatsUnavailable {
                requested,
                available,
            } => AppError::SeatsUnavailable {
                requested,
                available,
            },
            BookingError::NotCancellable(msg) => AppError::NotCancellable(msg),
            BookingError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            BookingError::Conflict(what) => AppError::Conflict(format!("{} already exists", what)),
            BookingError::Integrity(msg) => AppError::Internal(format!("Data integrity error: {}", msg)),
            BookingError::Store(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

/// Field the body error is reported under when serde names none.
pub const BODY_FIELD: &str = "body";

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        let field = missing_field(&message).unwrap_or(BODY_FIELD);
        AppError::Validation(ValidationErrors::single(field, message.as_str()))
    }
}

/// Pulls `name` out of serde's "missing field `name`" message.
fn missing_field(message: &str) -> Option<&str> {
    let rest = &message[message.find("missing field `")? + "missing field `".len()..];
    rest.split('`').next().filter(|name| !name.is_empty())
}
