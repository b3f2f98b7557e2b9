use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::auth::{JwtTokenVerifier, TokenConfig, TokenVerifier};
use crate::student::repository::StudentRepository;
use crate::user::repository::UserRepository;

/// Postgres SQLSTATE raised when a statement references a missing table
const UNDEFINED_TABLE: &str = "42P01";

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub student_repository: Arc<dyn StudentRepository + Send + Sync>,
    pub user_repository: Arc<dyn UserRepository + Send + Sync>,
    pub token_config: TokenConfig,
    pub token_verifier: Arc<dyn TokenVerifier + Send + Sync>,
}

impl AppState {
    /// Tokens minted at login are verified with the same config
    pub fn new(
        student_repository: Arc<dyn StudentRepository + Send + Sync>,
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        token_config: TokenConfig,
    ) -> Self {
        Self {
            student_repository,
            user_repository,
            token_verifier: Arc::new(JwtTokenVerifier::new(token_config.clone())),
            token_config,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Table not found: {0}")]
    MissingTable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error")]
    Internal,
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => {
                warn!(error = %error, "Database connection failure");
                AppError::Connection(error.to_string())
            }
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNDEFINED_TABLE) => {
                warn!(error = %error, "Statement referenced a missing table");
                AppError::MissingTable(db.message().to_string())
            }
            sqlx::Error::Database(db) => AppError::DatabaseError(db.message().to_string()),
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        AppError::DatabaseError(error.to_string())
    }
}

impl AppError {
    /// HTTP status used when this error reaches the transport layer
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::JwtError(_)
            | AppError::Unauthorized(_)
            | AppError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::OperationFailed(_) => StatusCode::BAD_REQUEST,
            AppError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::MissingTable(_)
            | AppError::DatabaseError(_)
            | AppError::Config(_)
            | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match self {
            AppError::JwtError(msg)
            | AppError::Unauthorized(msg)
            | AppError::InvalidCredentials(msg)
            | AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::OperationFailed(msg) => msg,
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

/// Next SERIAL value, failing like Postgres once the sequence is exhausted
pub(crate) fn next_id(last: i32, sequence: &str) -> Result<i32, AppError> {
    last.checked_add(1).ok_or_else(|| {
        warn!(sequence, "Id sequence exhausted");
        AppError::DatabaseError(format!(
            "nextval: reached maximum value of sequence \"{}\" ({})",
            sequence,
            i32::MAX
        ))
    })
}
