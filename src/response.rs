// Uniform response envelope returned by every service operation

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

use crate::auth::LOGIN_REQUIRED;
use crate::shared::AppError;

pub const CONNECTION_FAILED: &str = "Não foi possível conectar ao banco de dados.";
pub const TABLE_NOT_FOUND: &str = "Não foi possível encontrar a tabela.";

/// One of `{"unauthorized": ..}`, `{"error": ..}` or the bare success payload
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ServiceResponse<T> {
    Unauthorized {
        unauthorized: String,
    },
    Error {
        error: String,
        #[serde(skip)]
        status: StatusCode,
    },
    Success(T),
}

impl<T> ServiceResponse<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ServiceResponse::Success(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            ServiceResponse::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceResponse::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ServiceResponse::Error { status, .. } => *status,
            ServiceResponse::Success(_) => StatusCode::OK,
        }
    }
}

impl<T: Serialize> ServiceResponse<T> {
    /// Like `into_response`, but with a custom status for the success case
    pub fn into_response_with(self, success_status: StatusCode) -> Response {
        let status = if self.is_success() {
            success_status
        } else {
            self.status_code()
        };
        (status, Json(self)).into_response()
    }
}

impl<T: Serialize> IntoResponse for ServiceResponse<T> {
    fn into_response(self) -> Response {
        self.into_response_with(StatusCode::OK)
    }
}

impl<T> From<AppError> for ServiceResponse<T> {
    fn from(error: AppError) -> Self {
        let status = error.status_code();
        let message = match error {
            AppError::Unauthorized(msg) => {
                return ServiceResponse::Unauthorized { unauthorized: msg };
            }
            AppError::JwtError(_) => {
                return ServiceResponse::Unauthorized {
                    unauthorized: LOGIN_REQUIRED.to_string(),
                };
            }
            AppError::Connection(detail) => {
                warn!(detail = %detail, "Reporting database connection failure");
                CONNECTION_FAILED.to_string()
            }
            AppError::MissingTable(detail) => {
                warn!(detail = %detail, "Reporting missing table");
                TABLE_NOT_FOUND.to_string()
            }
            AppError::InvalidCredentials(msg)
            | AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::OperationFailed(msg)
            | AppError::DatabaseError(msg)
            | AppError::Config(msg) => msg,
            AppError::Internal => AppError::Internal.to_string(),
        };

        ServiceResponse::Error {
            error: message,
            status,
        }
    }
}

impl<T> From<Result<T, AppError>> for ServiceResponse<T> {
    fn from(result: Result<T, AppError>) -> Self {
        match result {
            Ok(data) => ServiceResponse::Success(data),
            Err(error) => error.into(),
        }
    }
}
