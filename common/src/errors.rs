//! Application error types.
//!
//! Every fallible operation in the service returns [`AppResult`]. Errors are
//! rendered to clients as `{"error": "<message>"}` with a matching status code.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ErrorBody;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Unified application error.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request failed validation (missing fields, bad paging, non-SELECT query).
    #[error("{0}")]
    Validation(String),

    /// No data source registered under the requested name.
    #[error("Data source not found")]
    DataSourceNotFound(String),

    /// The requested table does not exist in the data source.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// A data source with this name already exists (or the name is reserved).
    #[error("Data source name already exists")]
    DataSourceExists(String),

    /// Connection test failed while adding or updating a data source.
    #[error("Connection test failed: {0}")]
    ConnectionTest(String),

    /// Pool creation or connection acquisition failed.
    #[error("Database connection error: {0}")]
    DatabaseConnection(String),

    /// Any other driver fault; the driver's message is passed through.
    #[error("{0}")]
    DatabaseQuery(String),

    /// Config file could not be read, parsed or written.
    #[error("Config error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::DataSourceExists(_)
            | AppError::ConnectionTest(_) => StatusCode::BAD_REQUEST,
            AppError::DataSourceNotFound(_) | AppError::TableNotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseConnection(_)
            | AppError::DatabaseQuery(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(ErrorBody::new(self.to_string()))).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::DatabaseConnection(err.to_string())
            }
            sqlx::Error::Database(db) if db.code().as_deref() == Some(NO_SUCH_TABLE) => {
                AppError::TableNotFound(missing_table_name(db.message()))
            }
            sqlx::Error::Database(db) => AppError::DatabaseQuery(db.message().to_string()),
            other => AppError::DatabaseQuery(other.to_string()),
        }
    }
}

/// SQLSTATE of MySQL's "Table 'db.t' doesn't exist".
const NO_SUCH_TABLE: &str = "42S02";

fn missing_table_name(message: &str) -> String {
    message
        .split('\'')
        .nth(1)
        .map(|qualified| qualified.rsplit('.').next().unwrap_or(qualified))
        .unwrap_or(message)
        .to_string()
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(_: validator::ValidationErrors) -> Self {
        AppError::Validation("Missing required fields".to_string())
    }
}
