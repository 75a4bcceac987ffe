//! Response bodies shared across endpoints.
//!
//! Successful responses carry their payload directly (rows, table names,
//! relationship documents); these wrappers cover the remaining shapes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{DataSourceItem, PageRequest, Row};

/// Error body: `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Acknowledgement for mutations, optionally echoing the affected source.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<DataSourceItem>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: DataSourceItem) -> Self {
        Self {
            message: message.into(),
            source: Some(source),
        }
    }
}

/// Outcome of a connection test.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
}

impl ConnectionTestResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: "Connection successful".to_string(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// One page of table rows.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TablePage {
    /// Rows of the page (at most `limit`).
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Row>,
    /// Unfiltered row count of the table.
    pub total: u64,
    /// Current page number (1-based).
    pub page: u32,
    /// Page size.
    pub limit: u32,
}

impl TablePage {
    pub fn new(data: Vec<Row>, total: u64, request: PageRequest) -> Self {
        Self {
            data,
            total,
            page: request.page,
            limit: request.limit,
        }
    }
}
