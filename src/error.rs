// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Every store operation surfaces one of these; nothing is retried internally.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error (query execution failure, storage unreachable)
    InternalServerError(String),

    // 400 Bad Request (invalid paging input, rejected before any query)
    BadRequest(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (duplicate unique field, missing required field)
    ConstraintViolation(String),

    // A schema name was defined twice on the same registry.
    DuplicateSchema(&'static str),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DuplicateSchema(name) => {
                write!(f, "duplicate schema registration: '{}'", name)
            }
            other => write!(f, "{:?}", other),
        }
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Lets the request-handling layer return store errors with `?`.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            err @ (AppError::InternalServerError(_) | AppError::DuplicateSchema(_)) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConstraintViolation(msg) => (StatusCode::CONFLICT, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError`.
/// Unique and CHECK violations raised by the storage layer become
/// `ConstraintViolation`; everything else is a query-execution failure.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let message = db_err.message();
            if db_err.is_unique_violation() || message.contains("UNIQUE constraint") {
                return AppError::ConstraintViolation(message.to_string());
            }
            if db_err.is_check_violation() || message.contains("CHECK constraint") {
                return AppError::ConstraintViolation(message.to_string());
            }
        }
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        let cases = [
            (AppError::ConstraintViolation("dup".into()), StatusCode::CONFLICT),
            (AppError::BadRequest("page".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (
                AppError::InternalServerError("db down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::DuplicateSchema("users"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn server_errors_share_one_opaque_body() {
        for err in [
            AppError::InternalServerError("db down".into()),
            AppError::DuplicateSchema("users"),
        ] {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body, json!({ "error": "Internal Server Error" }));
        }
    }

    #[test]
    fn duplicate_schema_message_names_the_collection() {
        let msg = AppError::DuplicateSchema("articles").to_string();
        assert!(msg.contains("duplicate schema registration"));
        assert!(msg.contains("articles"));
    }
}
