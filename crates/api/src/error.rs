use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::models::SettingsError;
use domain::services::{LogServiceError, StoreError};
use persistence::repositories::SettingsStoreError;
use serde::Serialize;
use thiserror::Error;

use crate::services::LogFileError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A destructive operation needs to be re-issued with confirmation.
    #[error("Confirmation required for {count} records")]
    ConfirmationRequired { count: i64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<i64>,
}

#[derive(Debug, Clone)]
struct ValidationDetail {
    field: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, count) = match &self {
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone(), None)
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone(), None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            ApiError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone(), None)
            }
            ApiError::ConfirmationRequired { count } => (
                StatusCode::PRECONDITION_REQUIRED,
                "confirmation_required",
                format!(
                    "{} Log-Einträge würden gelöscht. Zum Bestätigen confirm=\"true\" senden.",
                    count
                ),
                Some(*count),
            ),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            count,
        };

        (status, Json(body)).into_response()
    }
}

impl From<LogServiceError> for ApiError {
    fn from(err: LogServiceError) -> Self {
        match err {
            LogServiceError::Validation(msg) => ApiError::Validation(msg),
            LogServiceError::NotFound(msg) => ApiError::NotFound(msg),
            LogServiceError::ConfirmationRequired { count } => {
                ApiError::ConfirmationRequired { count }
            }
            LogServiceError::Storage(e) => e.into(),
            LogServiceError::Export(e) => ApiError::Internal(format!("Export failed: {}", e)),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(format!("Storage error: {}", err))
    }
}

impl From<SettingsError> for ApiError {
    fn from(err: SettingsError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<SettingsStoreError> for ApiError {
    fn from(err: SettingsStoreError) -> Self {
        match err {
            SettingsStoreError::Invalid(e) => e.into(),
            SettingsStoreError::Database(e) => e.into(),
        }
    }
}

impl From<LogFileError> for ApiError {
    fn from(err: LogFileError) -> Self {
        match err {
            LogFileError::InvalidName(_) => ApiError::Validation(err.to_string()),
            LogFileError::NotFound(_) => ApiError::NotFound(err.to_string()),
            LogFileError::Io(e) => ApiError::Internal(format!("Log file access failed: {}", e)),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".into()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                // check_violation
                Some("23514") => ApiError::Validation(format!("Constraint violated: {}", db_err)),
                _ => ApiError::Internal(format!("Database error: {}", db_err)),
            },
            _ => ApiError::Internal(format!("Database error: {}", err)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = validation_details(&errors);

        let message = details
            .iter()
            .map(|d| d.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        ApiError::Validation(message)
    }
}

fn validation_details(errors: &validator::ValidationErrors) -> Vec<ValidationDetail> {
    let mut details: Vec<ValidationDetail> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| ValidationDetail {
                field: field.to_string(),
                message: e
                    .message
                    .clone()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field)),
            })
        })
        .collect();
    details.sort_by(|a, b| a.field.cmp(&b.field));
    details
}
