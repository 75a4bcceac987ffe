//! Query and table browsing models.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::datasource::DEFAULT_SOURCE_NAME;
use crate::errors::{AppError, AppResult};

/// One result row: column name → JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Default page size for table data.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

fn default_source() -> String {
    DEFAULT_SOURCE_NAME.to_string()
}

/// `?dataSource=` selector shared by most endpoints.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DataSourceParam {
    /// Data source name (defaults to `default`).
    #[serde(default = "default_source")]
    pub data_source: String,
}

/// Query string of `GET /api/tables/{table}/data`.
///
/// Paging values arrive as raw strings so that malformed input is reported
/// through the regular JSON error body.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TableDataParams {
    /// Data source name (defaults to `default`).
    pub data_source: Option<String>,
    /// 1-based page number (defaults to 1).
    pub page: Option<String>,
    /// Page size (defaults to 50).
    pub limit: Option<String>,
    /// JSON object of column → value.
    pub filters: Option<String>,
}

impl TableDataParams {
    pub fn data_source(&self) -> &str {
        self.data_source.as_deref().unwrap_or(DEFAULT_SOURCE_NAME)
    }

    /// Parses paging into a validated [`PageRequest`].
    pub fn page_request(&self) -> AppResult<PageRequest> {
        let page = parse_positive(self.page.as_deref(), "page", 1)?;
        let limit = parse_positive(self.limit.as_deref(), "limit", DEFAULT_PAGE_LIMIT)?;
        Ok(PageRequest { page, limit })
    }

    /// Parses the filter document; absent or blank means no filters.
    pub fn filter_map(&self) -> AppResult<serde_json::Map<String, serde_json::Value>> {
        let raw = match self.filters.as_deref().map(str::trim) {
            None | Some("") => return Ok(serde_json::Map::new()),
            Some(raw) => raw,
        };
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err(AppError::Validation(
                "filters must be a JSON object".to_string(),
            )),
            Err(e) => Err(AppError::Validation(format!("Invalid filters: {}", e))),
        }
    }
}

fn parse_positive(raw: Option<&str>, field: &str, default: u32) -> AppResult<u32> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => match value.parse::<u32>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(AppError::Validation(format!(
                "{} must be a positive integer",
                field
            ))),
        },
    }
}

/// Validated paging window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Row offset: `(page - 1) * limit`.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// Request body of `POST /api/query`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// SQL text; must be a SELECT statement.
    #[serde(default)]
    pub query: Option<String>,
    /// Data source name (defaults to `default`).
    #[serde(default = "default_source")]
    pub data_source: String,
}
