//!
//! # Error Handling
//!
//! Two error families live here:
//!
//! - [`AppError`] is returned by HTTP handlers. It implements
//!   `actix_web::error::ResponseError`, so a handler can bubble it up with `?`
//!   and the client receives a status code plus a JSON body of the form
//!   `{"detail": "<message>"}`.
//! - [`StartupError`] is returned by the startup orchestrator. Every variant is
//!   fatal; `main` turns it into a non-zero process exit.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use validator::ValidationErrors;

/// Errors surfaced by request handlers and middleware.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Authentication failed or is missing (HTTP 401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// Malformed request or a business rule rejection (HTTP 400).
    #[error("Bad Request: {0}")]
    BadRequest(String),
    /// The resource does not exist or is not visible to the caller (HTTP 404).
    #[error("Not Found: {0}")]
    NotFound(String),
    /// Unexpected server-side failure (HTTP 500).
    #[error("Internal Server Error: {0}")]
    InternalServerError(String),
    /// A database operation failed (HTTP 500).
    #[error("Database Error: {0}")]
    DatabaseError(String),
    /// Input failed validation after deserialization (HTTP 422).
    #[error("Validation Error: {0}")]
    ValidationError(String),
}

impl AppError {
    fn detail(&self) -> &str {
        match self {
            AppError::Unauthorized(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::InternalServerError(msg)
            | AppError::ValidationError(msg) => msg,
            // Driver messages can leak schema details.
            AppError::DatabaseError(_) => "Database error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::DatabaseError(msg) = self {
            log::error!("database error: {}", msg);
        }
        HttpResponse::build(self.status_code()).json(json!({ "detail": self.detail() }))
    }
}

/// `RowNotFound` maps to 404, everything else is a database failure.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(error.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

/// Fatal failures of the startup sequence.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// The readiness probe never succeeded within the attempt budget.
    #[error("database not available after {attempts} attempts: {source}")]
    DatabaseUnavailable {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    /// The migration tool ran and reported failure.
    #[error("migration tool exited with {status}: {output}")]
    MigrationFailed { status: String, output: String },

    /// The migration tool could not be invoked or the embedded migrator errored.
    #[error("failed to run migrations: {0}")]
    Migrator(String),

    #[error("cannot create database pool: {0}")]
    Pool(#[source] sqlx::Error),

    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

impl From<sqlx::migrate::MigrateError> for StartupError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        StartupError::Migrator(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_statuses() {
        let cases = [
            (AppError::Unauthorized("Invalid token".into()), 401),
            (AppError::BadRequest("Invalid input".into()), 400),
            (AppError::NotFound("Resource not found".into()), 404),
            (AppError::InternalServerError("Server error".into()), 500),
            (AppError::DatabaseError("relation missing".into()), 500),
            (AppError::ValidationError("title: length".into()), 422),
        ];
        for (error, status) in cases {
            assert_eq!(error.error_response().status().as_u16(), status, "{}", error);
        }
    }

    #[actix_rt::test]
    async fn test_error_body_uses_detail_field() {
        let response = AppError::NotFound("Task not found".into()).error_response();
        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({ "detail": "Task not found" }));
    }

    #[actix_rt::test]
    async fn test_database_error_message_is_not_exposed() {
        let response = AppError::DatabaseError("column \"secret\" does not exist".into())
            .error_response();
        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["detail"], "Database error");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            AppError::from(sqlx::Error::RowNotFound),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(sqlx::Error::PoolTimedOut),
            AppError::DatabaseError(_)
        ));
    }
}
