//! HTTP server for bulk manifest uploads.
//!
//! # API Endpoints
//!
//! | Method | Path           | Description                                  |
//! |--------|----------------|----------------------------------------------|
//! | GET    | `/health`      | Health check                                 |
//! | POST   | `/api/check`   | Validate a workbook and return the payloads  |
//! | POST   | `/api/submit`  | Validate, build and submit a workbook        |
//! | GET    | `/api/logs`    | SSE stream for real-time progress            |
//!
//! Uploads are multipart forms with the workbook in a `file` field.

use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::client::EManifestClient;
use super::logs::{log_info, LOG_BROADCASTER};
use super::types::{BatchResponse, CheckResponse};
use crate::transform::{check_bytes, process_bytes};

/// Multipart field holding the workbook.
const FILE_FIELD: &str = "file";

#[derive(Clone)]
struct AppState {
    client: Arc<EManifestClient>,
}

fn router(client: Arc<EManifestClient>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/check", post(check_upload))
        .route("/api/submit", post(submit_upload))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(AppState { client })
}

/// Start the HTTP server
pub async fn start_server(
    port: u16,
    client: EManifestClient,
) -> Result<(), Box<dyn std::error::Error>> {
    let environment = client.environment();
    let app = router(Arc::new(client));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, %environment, "🚀 manifest-bulk server running");
    tracing::info!("   POST /api/check  - Validate workbook");
    tracing::info!("   POST /api/submit - Submit workbook to e-Manifest");
    tracing::info!("   GET  /api/logs   - SSE log stream");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "manifest-bulk",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.client.environment().name(),
        "endpoints": {
            "check": "POST /api/check",
            "submit": "POST /api/submit",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // lagged receivers just skip entries
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Pull the workbook bytes out of the upload.
async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>, Response> {
    let bad_request = |message: String| {
        let body = BatchResponse::InputErrors {
            sheet: None,
            message,
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Multipart error: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("Read error: {e}")))?;

        log_info(format!("📄 Received {name} ({} bytes)", bytes.len()));
        return Ok(bytes.to_vec());
    }

    Err(bad_request("No file provided".to_string()))
}

/// Dry run: validate and build without submitting.
async fn check_upload(multipart: Multipart) -> Response {
    let bytes = match read_upload(multipart).await {
        Ok(bytes) => bytes,
        Err(response) => return response,
    };

    // spreadsheet decoding and validation are CPU bound
    let result = tokio::task::spawn_blocking(move || check_bytes(&bytes)).await;
    match result {
        Ok(Ok(payloads)) => Json(CheckResponse::ready(payloads)).into_response(),
        Ok(Err(err)) => batch_response(err.into()),
        Err(join) => batch_response(BatchResponse::SystemError {
            message: format!("Check failed: {join}"),
            partial_results: None,
        }),
    }
}

async fn submit_upload(State(state): State<AppState>, multipart: Multipart) -> Response {
    let bytes = match read_upload(multipart).await {
        Ok(bytes) => bytes,
        Err(response) => return response,
    };

    batch_response(process_bytes(&bytes, state.client.as_ref()).await)
}

fn batch_response(response: BatchResponse) -> Response {
    let status = match &response {
        BatchResponse::Submitted { .. } => StatusCode::OK,
        BatchResponse::ValidationErrors { .. } | BatchResponse::InputErrors { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        BatchResponse::AuthErrors { .. } => StatusCode::UNAUTHORIZED,
        BatchResponse::SystemError { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, Json(response)).into_response()
}
