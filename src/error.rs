//!
//! # Error Handling
//!
//! `AppError` is the single error type returned by services, stores and handlers.
//! It implements `actix_web::error::ResponseError`, so a handler returning
//! `Result<_, AppError>` is rendered as a JSON body of the form `{"error": "..."}`
//! with the status code of the variant.
//!
//! `From` conversions exist for `sqlx::Error`, `validator::ValidationErrors`,
//! `jsonwebtoken::errors::Error` and `bcrypt::BcryptError` so the `?` operator
//! can be used throughout.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Authentication failed or is missing (HTTP 401).
    Unauthorized(String),
    /// Malformed or semantically invalid request, e.g. a due date in the past (HTTP 400).
    BadRequest(String),
    /// One or more referenced records do not exist (HTTP 404).
    NotFound(String),
    /// A unique username or email is already taken.
    ///
    /// Rendered as HTTP 401: registration conflicts are reported the same way as
    /// other credential failures on the public surface.
    Conflict(String),
    /// Unexpected server-side error (HTTP 500).
    InternalServerError(String),
    /// Error originating from database operations (HTTP 500).
    DatabaseError(String),
    /// The storage backend could not be reached (HTTP 503).
    ServiceUnavailable(String),
    /// Failed input validation (HTTP 422 Unprocessable Entity).
    ValidationError(String),
}

impl AppError {
    /// Builds the batched not-found error for a set of user ids that could not be resolved.
    pub fn missing_users(ids: &[i32]) -> Self {
        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        AppError::NotFound(format!("Users with IDs {} not found", joined))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) | AppError::Conflict(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let msg = match self {
            AppError::Unauthorized(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::ServiceUnavailable(msg)
            | AppError::ValidationError(msg) => msg.as_str(),
            // Internal details stay in the logs.
            AppError::InternalServerError(msg) | AppError::DatabaseError(msg) => {
                log::error!("{}", msg);
                "Internal server error"
            }
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": msg }))
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `RowNotFound` becomes `NotFound`, unique violations become `Conflict`, and pool or
/// I/O failures become `ServiceUnavailable`. Everything else is a `DatabaseError`.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(ref db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                AppError::Conflict("Username or email already exists".into())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::ServiceUnavailable("Database unavailable".into())
            }
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

/// Lists each failing field with its rule codes (or the rule's own message).
/// Submitted values are never included.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        let mut fields: Vec<String> = error
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let reasons = errors
                    .iter()
                    .map(|e| e.message.as_deref().unwrap_or(&*e.code))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}: {}", field, reasons)
            })
            .collect();
        fields.sort();
        AppError::ValidationError(format!("Validation failed: {}", fields.join("; ")))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(format!("Invalid token: {}", error))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(format!("Password hashing failed: {}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_responses() {
        let response = AppError::Unauthorized("Invalid token".into()).error_response();
        assert_eq!(response.status(), 401);

        let response = AppError::BadRequest("Due date cannot be in the past".into()).error_response();
        assert_eq!(response.status(), 400);

        let response = AppError::NotFound("Task with ID 3 not found".into()).error_response();
        assert_eq!(response.status(), 404);

        let response = AppError::Conflict("Username or email already exists".into()).error_response();
        assert_eq!(response.status(), 401);

        let response = AppError::ValidationError("title: length".into()).error_response();
        assert_eq!(response.status(), 422);

        let response = AppError::ServiceUnavailable("Database unavailable".into()).error_response();
        assert_eq!(response.status(), 503);

        let response = AppError::DatabaseError("connection reset".into()).error_response();
        assert_eq!(response.status(), 500);
    }

    #[test]
    fn test_missing_users_lists_every_id() {
        match AppError::missing_users(&[2, 7, 9]) {
            AppError::NotFound(msg) => assert_eq!(msg, "Users with IDs 2, 7, 9 not found"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_validation_message_omits_submitted_values() {
        let mut errors = ValidationErrors::new();
        let mut too_long = validator::ValidationError::new("length");
        too_long.add_param("value".into(), &"hunter2-hunter2");
        too_long.add_param("max".into(), &128);
        errors.add("password", too_long);
        errors.add("email", validator::ValidationError::new("email"));

        match AppError::from(errors) {
            AppError::ValidationError(msg) => {
                assert_eq!(msg, "Validation failed: email: email; password: length");
                assert!(!msg.contains("hunter2"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_sqlx_error_mapping() {
        assert!(matches!(
            AppError::from(sqlx::Error::RowNotFound),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(sqlx::Error::PoolTimedOut),
            AppError::ServiceUnavailable(_)
        ));
    }
}
