//! HTTP handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;
use validator::Validate;

use common::errors::{AppError, AppResult};
use common::extract::{AppJson, AppQuery};
use common::models::{
    ConnectionParams, CreateDataSourceRequest, DataSourceItem, DataSourceParam, QueryRequest,
    RelationshipMap, Row, TableDataParams,
};
use common::response::{ConnectionTestResult, ErrorBody, MessageResponse, TablePage};
use common::utils::SqlValidator;

use crate::service::{RelationshipResolver, TableService};
use crate::state::AppState;

pub const SERVICE_NAME: &str = "viewer-service";

/// List the tables of a data source
#[utoipa::path(
    get,
    path = "/api/tables",
    tag = "tables",
    params(DataSourceParam),
    responses(
        (status = 200, description = "Table names", body = Vec<String>),
        (status = 404, description = "Unknown data source", body = ErrorBody)
    )
)]
pub async fn list_tables(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<DataSourceParam>,
) -> AppResult<Json<Vec<String>>> {
    let executor = state.executor(&params.data_source).await?;
    let tables = TableService::new(&executor).list_tables().await?;
    Ok(Json(tables))
}

/// Describe the columns of a table
#[utoipa::path(
    get,
    path = "/api/tables/{table}/structure",
    tag = "tables",
    params(
        ("table" = String, Path, description = "Table name"),
        DataSourceParam
    ),
    responses(
        (status = 200, description = "Column descriptors", body = Vec<Object>),
        (status = 404, description = "Unknown data source or table", body = ErrorBody)
    )
)]
pub async fn table_structure(
    State(state): State<AppState>,
    Path(table): Path<String>,
    AppQuery(params): AppQuery<DataSourceParam>,
) -> AppResult<Json<Vec<Row>>> {
    let executor = state.executor(&params.data_source).await?;
    let columns = TableService::new(&executor).describe(&table).await?;
    Ok(Json(columns))
}

/// Fetch one filtered page of table rows
#[utoipa::path(
    get,
    path = "/api/tables/{table}/data",
    tag = "tables",
    params(
        ("table" = String, Path, description = "Table name"),
        TableDataParams
    ),
    responses(
        (status = 200, description = "Page of rows", body = TablePage),
        (status = 400, description = "Invalid paging or filters", body = ErrorBody),
        (status = 404, description = "Unknown data source or table", body = ErrorBody)
    )
)]
pub async fn table_data(
    State(state): State<AppState>,
    Path(table): Path<String>,
    AppQuery(params): AppQuery<TableDataParams>,
) -> AppResult<Json<TablePage>> {
    let executor = state.executor(params.data_source()).await?;
    let request = params.page_request()?;
    let filters = params.filter_map()?;
    let page = TableService::new(&executor)
        .page(&table, request, &filters)
        .await?;
    Ok(Json(page))
}

/// Fetch rows related to one record
#[utoipa::path(
    get,
    path = "/api/tables/{table}/{id}/related",
    tag = "tables",
    params(
        ("table" = String, Path, description = "Local table name"),
        ("id" = String, Path, description = "Record id matched against each foreign key"),
        DataSourceParam
    ),
    responses(
        (status = 200, description = "Foreign table to related rows", body = Object),
        (status = 404, description = "Unknown data source", body = ErrorBody)
    )
)]
pub async fn related_data(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    AppQuery(params): AppQuery<DataSourceParam>,
) -> AppResult<Json<Map<String, Value>>> {
    let executor = state.executor(&params.data_source).await?;
    let related = RelationshipResolver::new(&state.store)
        .resolve(&executor, &table, &id)
        .await?;
    Ok(Json(related))
}

/// Read the relationship configuration
#[utoipa::path(
    get,
    path = "/api/relationships",
    tag = "relationships",
    responses(
        (status = 200, description = "Table to relationship list", body = Object)
    )
)]
pub async fn get_relationships(State(state): State<AppState>) -> AppResult<Json<RelationshipMap>> {
    Ok(Json(state.store.load_relationships().await?))
}

/// Replace the relationship configuration
#[utoipa::path(
    post,
    path = "/api/relationships",
    tag = "relationships",
    request_body = Object,
    responses(
        (status = 200, description = "Relationships saved", body = MessageResponse),
        (status = 400, description = "Relationship without foreignTable or foreignKey", body = ErrorBody)
    )
)]
pub async fn save_relationships(
    State(state): State<AppState>,
    AppJson(relationships): AppJson<RelationshipMap>,
) -> AppResult<Json<MessageResponse>> {
    for relationship in relationships.values().flatten() {
        relationship.validate()?;
    }
    state.store.save_relationships(&relationships).await?;

    tracing::info!(tables = relationships.len(), "relationships saved");
    Ok(Json(MessageResponse::new("Relationships saved successfully")))
}

/// Run an ad-hoc SELECT statement
#[utoipa::path(
    post,
    path = "/api/query",
    tag = "query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Result rows", body = Vec<Object>),
        (status = 400, description = "Not a SELECT statement", body = ErrorBody),
        (status = 404, description = "Unknown data source", body = ErrorBody)
    )
)]
pub async fn run_query(
    State(state): State<AppState>,
    AppJson(req): AppJson<QueryRequest>,
) -> AppResult<Json<Vec<Row>>> {
    let executor = state.executor(&req.data_source).await?;
    let sql = SqlValidator::require_select(req.query.as_deref())?;
    let rows = TableService::new(&executor).select(Some(sql)).await?;
    Ok(Json(rows))
}

/// List data sources, default first
#[utoipa::path(
    get,
    path = "/api/datasources",
    tag = "datasources",
    responses(
        (status = 200, description = "Data sources without passwords", body = Vec<DataSourceItem>)
    )
)]
pub async fn list_data_sources(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<DataSourceItem>>> {
    Ok(Json(state.pool_manager.list().await?))
}

/// Add a data source
#[utoipa::path(
    post,
    path = "/api/datasources",
    tag = "datasources",
    request_body = CreateDataSourceRequest,
    responses(
        (status = 200, description = "Data source added", body = MessageResponse),
        (status = 400, description = "Missing fields, duplicate name or failed connection test", body = ErrorBody)
    )
)]
pub async fn add_data_source(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateDataSourceRequest>,
) -> AppResult<Json<MessageResponse>> {
    req.validate()?;
    let source = state.pool_manager.add(req.into_source()).await?;
    Ok(Json(MessageResponse::with_source(
        "Data source added successfully",
        source.into(),
    )))
}

/// Replace the connection settings of a data source
#[utoipa::path(
    put,
    path = "/api/datasources/{name}",
    tag = "datasources",
    params(
        ("name" = String, Path, description = "Data source name")
    ),
    request_body = ConnectionParams,
    responses(
        (status = 200, description = "Data source updated", body = MessageResponse),
        (status = 400, description = "Missing fields, default source or failed connection test", body = ErrorBody),
        (status = 404, description = "Unknown data source", body = ErrorBody)
    )
)]
pub async fn update_data_source(
    State(state): State<AppState>,
    Path(name): Path<String>,
    AppJson(params): AppJson<ConnectionParams>,
) -> AppResult<Json<MessageResponse>> {
    params.validate()?;
    let source = state.pool_manager.replace(&name, params).await?;
    Ok(Json(MessageResponse::with_source(
        "Data source updated successfully",
        source.into(),
    )))
}

/// Delete a data source
#[utoipa::path(
    delete,
    path = "/api/datasources/{name}",
    tag = "datasources",
    params(
        ("name" = String, Path, description = "Data source name")
    ),
    responses(
        (status = 200, description = "Data source deleted", body = MessageResponse),
        (status = 400, description = "Default source", body = ErrorBody),
        (status = 404, description = "Unknown data source", body = ErrorBody)
    )
)]
pub async fn delete_data_source(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    state.pool_manager.remove(&name).await?;
    Ok(Json(MessageResponse::new("Data source deleted successfully")))
}

/// Test connection settings without saving them
#[utoipa::path(
    post,
    path = "/api/datasources/test",
    tag = "datasources",
    request_body = ConnectionParams,
    responses(
        (status = 200, description = "Connection test outcome", body = ConnectionTestResult),
        (status = 400, description = "Missing fields", body = ErrorBody)
    )
)]
pub async fn test_data_source(
    State(state): State<AppState>,
    AppJson(params): AppJson<ConnectionParams>,
) -> AppResult<Json<ConnectionTestResult>> {
    params.validate()?;
    let result = match state.pool_manager.test(&params.into_unsaved()).await {
        Ok(()) => ConnectionTestResult::ok(),
        Err(AppError::ConnectionTest(message)) => ConnectionTestResult::failed(message),
        Err(e) => ConnectionTestResult::failed(e.to_string()),
    };
    Ok(Json(result))
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        data_sources: state.pool_manager.pool_count().await,
        sql_log_format: state.config.sql_log_format.to_string(),
    })
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    /// Number of registered data source pools.
    pub data_sources: usize,
    /// Layout used for SQL statement logs.
    pub sql_log_format: String,
}
