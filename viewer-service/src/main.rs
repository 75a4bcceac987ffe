//! MySQL viewer service
//!
//! Browses tables of one or more MySQL data sources:
//! - table listing, structure and filtered paging
//! - related rows through user-declared relationships
//! - ad-hoc SELECT queries
//! - data source management

mod config_store;
mod executor;
mod handlers;
mod pool_manager;
mod routes;
mod service;
mod state;

use anyhow::Context;
use axum::{middleware, routing::get, Json, Router};
use common::config::AppConfig;
use common::middleware::request_id_middleware;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MySQL Viewer API",
        version = "0.1.0",
        description = "Table browsing and data source management for MySQL"
    ),
    paths(
        handlers::list_tables,
        handlers::table_structure,
        handlers::table_data,
        handlers::related_data,
        handlers::get_relationships,
        handlers::save_relationships,
        handlers::run_query,
        handlers::list_data_sources,
        handlers::add_data_source,
        handlers::update_data_source,
        handlers::delete_data_source,
        handlers::test_data_source,
        handlers::health_check,
    ),
    components(schemas(
        common::models::DataSourceItem,
        common::models::CreateDataSourceRequest,
        common::models::ConnectionParams,
        common::models::QueryRequest,
        common::models::Relationship,
        common::models::RelationshipType,
        common::response::ErrorBody,
        common::response::MessageResponse,
        common::response::ConnectionTestResult,
        common::response::TablePage,
        handlers::HealthResponse,
    )),
    tags(
        (name = "tables", description = "Table browsing"),
        (name = "relationships", description = "Relationship configuration"),
        (name = "query", description = "Ad-hoc SELECT queries"),
        (name = "datasources", description = "Data source management"),
        (name = "health", description = "Health check")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    // LOG_FORMAT=json switches to one JSON object per line
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::from_env();
    info!(
        config_dir = %config.config_dir.display(),
        sql_log_format = %config.sql_log_format,
        default_host = %config.default_source.host,
        default_database = %config.default_source.database,
        "configuration loaded"
    );

    let state = AppState::new(config.clone())
        .await
        .context("failed to initialize application state")?;

    info!(data_sources = ?state.pool_manager.names().await, "data sources ready");

    let app = create_router(state);

    let addr = config.bind_addr();
    info!(service = handlers::SERVICE_NAME, address = %addr, "starting service");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use crate::config_store::ConfigStore;
    use common::models::DataSource;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    /// App whose default source points at a closed port.
    async fn app(dir: &TempDir) -> Router {
        let config = AppConfig {
            config_dir: dir.path().to_path_buf(),
            connect_timeout_secs: 1,
            default_source: DataSource::default_from_parts("127.0.0.1", 1, "root", "", "test"),
            ..AppConfig::default()
        };
        create_router(AppState::new(config).await.unwrap())
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn source_body(name: &str) -> Value {
        json!({"name": name, "host": "127.0.0.1", "port": 1, "user": "root", "database": "app"})
    }

    #[tokio::test]
    async fn test_health_and_request_id() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], "req-42");

        let (status, body) = send(&app, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["dataSources"], 1);
        assert_eq!(body["sqlLogFormat"], "formatted");
    }

    #[tokio::test]
    async fn test_generated_request_id() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(&dir)
            .await
            .oneshot(Request::builder().uri("/api/datasources").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let id = response.headers()["x-request-id"].to_str().unwrap();
        assert_eq!(id.len(), 36);
    }

    #[tokio::test]
    async fn test_list_data_sources_hides_password() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (status, body) = send(&app, Method::GET, "/api/datasources", None).await;
        assert_eq!(status, StatusCode::OK);
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["name"], "default");
        assert_eq!(items[0]["isDefault"], true);
        assert!(items[0].get("password").is_none());
    }

    #[tokio::test]
    async fn test_default_source_is_protected() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (status, body) =
            send(&app, Method::POST, "/api/datasources", Some(source_body("default"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Data source name already exists");

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/datasources/default",
            Some(source_body("default")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Cannot modify default data source");

        let (status, body) = send(&app, Method::DELETE, "/api/datasources/default", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Cannot delete default data source");

        let (_, body) = send(&app, Method::GET, "/api/datasources", None).await;
        assert_eq!(body[0]["name"], "default");
    }

    #[tokio::test]
    async fn test_missing_fields_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (status, body) =
            send(&app, Method::POST, "/api/datasources", Some(json!({"name": "x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/datasources/test",
            Some(json!({"host": "127.0.0.1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields");
    }

    #[tokio::test]
    async fn test_connection_failure_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/datasources/test",
            Some(source_body("unreachable")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert!(!body["message"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_data_source_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        for uri in [
            "/api/tables?dataSource=ghost",
            "/api/tables/orders/structure?dataSource=ghost",
            "/api/tables/orders/data?dataSource=ghost",
            "/api/tables/users/1/related?dataSource=ghost",
        ] {
            let (status, body) = send(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
            assert_eq!(body["error"], "Data source not found");
        }

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/query",
            Some(json!({"query": "SELECT 1", "dataSource": "ghost"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::DELETE, "/api/datasources/ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_non_select_query_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/query",
            Some(json!({"query": "DROP TABLE users"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Only SELECT queries are allowed");

        let (status, _) = send(&app, Method::POST, "/api/query", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_paging_and_filters_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        for uri in [
            "/api/tables/orders/data?page=0",
            "/api/tables/orders/data?limit=abc",
            "/api/tables/orders/data?filters=%7Bbroken",
            "/api/tables/orders/data?filters=%5B1%5D",
        ] {
            let (status, body) = send(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_relationships_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (_, body) = send(&app, Method::GET, "/api/relationships", None).await;
        assert_eq!(body, json!({}));

        let doc = json!({
            "users": [
                {"foreignTable": "orders", "foreignKey": "user_id", "localKey": "id", "relationshipType": "one-to-many"},
                {"foreignTable": "profiles", "foreignKey": "user_id"}
            ]
        });
        let (status, body) =
            send(&app, Method::POST, "/api/relationships", Some(doc.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Relationships saved successfully");

        let (_, body) = send(&app, Method::GET, "/api/relationships", None).await;
        assert_eq!(body, doc);
        assert!(dir.path().join("relationships.json").exists());
    }

    #[tokio::test]
    async fn test_incomplete_relationship_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/relationships",
            Some(json!({"users": [{"foreignTable": "", "foreignKey": "user_id"}]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!dir.path().join("relationships.json").exists());
    }

    #[tokio::test]
    async fn test_openapi_document_served() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (status, body) = send(&app, Method::GET, "/api-docs/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"].get("/api/tables/{table}/data").is_some());
    }

    async fn send_raw(app: &Router, uri: &str, content_type: Option<&str>, body: &'static str) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(Method::POST).uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let response = app
            .clone()
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_malformed_bodies_answer_json_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let cases = [
            ("/api/datasources", Some("application/json"), "{not json"),
            ("/api/datasources/test", Some("application/json"), r#"{"host": "h", "port": "abc", "user": "u", "database": "d"}"#),
            ("/api/query", None, r#"{"query": "SELECT 1"}"#),
            (
                "/api/relationships",
                Some("application/json"),
                r#"{"users": [{"foreignTable": "orders", "foreignKey": "user_id", "relationshipType": "many-to-many"}]}"#,
            ),
        ];
        for (uri, content_type, body) in cases {
            let (status, body) = send_raw(&app, uri, content_type, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body["error"].is_string(), "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_string_port_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/datasources/test",
            Some(json!({"host": "127.0.0.1", "port": "1", "user": "root", "database": "app"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_bad_query_string_answers_json_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (status, body) = send(&app, Method::GET, "/api/tables?dataSource=a&dataSource=b", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_data_source_checked_before_params() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (status, body) = send(
            &app,
            Method::GET,
            "/api/tables/orders/data?dataSource=ghost&page=0",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Data source not found");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/query",
            Some(json!({"query": "DELETE FROM users", "dataSource": "ghost"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_source_named_test_is_reachable() {
        let dir = tempfile::tempdir().unwrap();

        let app = app(&dir).await;
        let (status, body) = send(&app, Method::DELETE, "/api/datasources/test", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Data source not found");

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/datasources/test",
            Some(json!({"host": "127.0.0.1", "port": 1, "user": "root", "database": "app"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Data source not found");

        let stored = DataSource {
            name: "test".to_string(),
            is_default: false,
            ..DataSource::default_from_parts("127.0.0.1", 1, "root", "", "app")
        };
        ConfigStore::new(dir.path())
            .save_data_sources(&[stored])
            .await
            .unwrap();

        let app = self::app(&dir).await;
        let (_, body) = send(&app, Method::GET, "/api/datasources", None).await;
        assert_eq!(body[1]["name"], "test");

        let (status, body) = send(&app, Method::DELETE, "/api/datasources/test", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Data source deleted successfully");

        let (_, body) = send(&app, Method::GET, "/api/datasources", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert!(ConfigStore::new(dir.path())
            .load_data_sources()
            .await
            .unwrap()
            .is_empty());
    }
}
