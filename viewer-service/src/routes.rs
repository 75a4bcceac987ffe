//! Viewer service routes.

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Router,
};

use common::extract::AppJson;
use common::models::ConnectionParams;

use crate::handlers::{
    add_data_source, delete_data_source, get_relationships, health_check, list_data_sources,
    list_tables, related_data, run_query, save_relationships, table_data, table_structure,
    test_data_source, update_data_source,
};
use crate::state::AppState;

const TEST_SEGMENT: &str = "test";

/// Builds the API routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tables", get(list_tables))
        .route("/api/tables/{table}/structure", get(table_structure))
        .route("/api/tables/{table}/data", get(table_data))
        .route("/api/tables/{table}/{id}/related", get(related_data))
        .route(
            "/api/relationships",
            get(get_relationships).post(save_relationships),
        )
        .route("/api/query", post(run_query))
        .route(
            "/api/datasources",
            get(list_data_sources).post(add_data_source),
        )
        // The static segment shadows `{name}`, so a source named `test` is
        // updated and deleted through this route.
        .route(
            "/api/datasources/test",
            post(test_data_source)
                .put(|state: State<AppState>, body: AppJson<ConnectionParams>| {
                    update_data_source(state, Path(TEST_SEGMENT.to_string()), body)
                })
                .delete(|state: State<AppState>| {
                    delete_data_source(state, Path(TEST_SEGMENT.to_string()))
                }),
        )
        .route(
            "/api/datasources/{name}",
            put(update_data_source).delete(delete_data_source),
        )
        .route("/api/health", get(health_check))
}
