//! HTTP Server for the mastery API.
//!
//! # API Endpoints
//!
//! | Method | Path                     | Description                                   |
//! |--------|--------------------------|-----------------------------------------------|
//! | GET    | `/health`                | Health check                                  |
//! | POST   | `/api/intermediate_xlsx` | Test submissions (JSON) → intermediate table  |
//! | POST   | `/api/final_xlsx`        | Intermediate spreadsheet (multipart) → report |
//! | GET    | `/api/logs`              | SSE log stream (`?operation=` to filter)      |

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, HeaderName, Method},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, env, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{Operation, OperationLog, LOG_BROADCASTER};
use super::types::{LogFilter, SheetUpload, TableResponse};
use crate::error::{ServerError, ServerResult};
use crate::transform::pipeline::{aggregate_upload, normalize_json, AggregateOptions, DEFAULT_UPLOAD_DIR};

/// Default listening port
pub const DEFAULT_PORT: u16 = 8080;

/// Largest accepted request body (uploads included).
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Server settings, from CLI flags or `LOMASTERY_*` environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Staging directory for uploaded workbooks
    pub upload_dir: PathBuf,
}

impl ServerConfig {
    /// Read `LOMASTERY_PORT` and `LOMASTERY_UPLOAD_DIR`, falling back to defaults.
    pub fn from_env() -> Self {
        let port = env::var("LOMASTERY_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let upload_dir = env::var("LOMASTERY_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_UPLOAD_DIR));

        Self { port, upload_dir }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
        }
    }
}

/// Build the application router
pub fn build_router(config: ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("x-requested-with"),
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
        ]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/intermediate_xlsx", post(intermediate_table))
        .route("/api/final_xlsx", post(final_report))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(Arc::new(config))
}

/// Start the HTTP server
pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    println!("🚀 LO mastery server running on http://localhost:{}", config.port);
    println!("   POST /api/intermediate_xlsx - Normalize test results");
    println!("   POST /api/final_xlsx        - Aggregate intermediate spreadsheet");
    println!("   GET  /api/logs              - SSE log stream");
    println!("   GET  /health                - Health check");
    println!("📁 Uploads staged in {}", config.upload_dir.display());
    println!();

    let app = build_router(config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "lomastery",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "normalize": "POST /api/intermediate_xlsx",
            "aggregate": "POST /api/final_xlsx",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming, optionally for one operation
async fn sse_logs(
    Query(filter): Query<LogFilter>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();
    let wanted = filter.operation;

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let entry = result.ok()?;
        if !entry.matches(wanted) {
            return None;
        }
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Normalize endpoint: JSON test submissions → intermediate table
async fn intermediate_table(body: Bytes) -> ServerResult<Json<TableResponse>> {
    let table = normalize_json(&body).map_err(|e| {
        OperationLog::new(Operation::Normalize).error(format!("Normalize failed: {}", e));
        ServerError::from(e)
    })?;

    Ok(Json(table.to_grid()))
}

/// Aggregate endpoint: multipart spreadsheet upload → final report
async fn final_report(
    State(config): State<Arc<ServerConfig>>,
    multipart: Multipart,
) -> ServerResult<Json<TableResponse>> {
    let upload = SheetUpload::from_multipart(multipart).await?;
    let options = AggregateOptions {
        num_tests: upload.num_tests,
        upload_dir: config.upload_dir.clone(),
    };

    let report = tokio::task::spawn_blocking(move || {
        aggregate_upload(&upload.bytes, upload.file_name.as_deref(), &options)
    })
    .await
    .map_err(|e| ServerError::Internal(format!("Aggregation task failed: {}", e)))?
    .map_err(|e| {
        OperationLog::new(Operation::Aggregate).error(format!("Aggregate failed: {}", e));
        ServerError::from(e)
    })?;

    Ok(Json(report.to_grid()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn test_intermediate_table_handler() {
        let body = Bytes::from_static(
            br#"[{"name":"Unit 1","datFile":"AZED 10 1\nAAMY 11 2\n","loFile":"12"}]"#,
        );
        let Json(table) = intermediate_table(body).await.unwrap();
        assert_eq!(table, vec![vec!["12"], vec!["MY", "11"], vec!["ZED", "10"]]);
    }

    #[tokio::test]
    async fn test_intermediate_table_rejects_short_line() {
        let body = Bytes::from_static(br#"[{"name":"Unit 1","datFile":"AZED\n","loFile":"12"}]"#);
        let err = intermediate_table(body).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
    }

    #[test]
    fn test_router_builds() {
        let _router = build_router(ServerConfig::default());
    }
}
