//! HTTP server
//!
//! `POST /classify` accepts a multipart upload with a `file` field and
//! returns the scan report as JSON.

use anyhow::Result;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::analysis::ScanReport;
use crate::pipeline::{LabelScanner, ScanError};

/// Name of the multipart field carrying the image
pub const FILE_FIELD: &str = "file";

/// State shared across routes
#[derive(Clone)]
pub struct AppState {
    pub scanner: Arc<LabelScanner>,
}

/// Errors returned to HTTP clients
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("Missing file field")]
    MissingFile,
    #[error(transparent)]
    Upload(#[from] MultipartError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Scan(ScanError::InvalidImage(e)) => {
                warn!("Rejected upload: {}", e);
                (StatusCode::BAD_REQUEST, "Invalid image".to_string())
            }
            ApiError::Scan(ScanError::NoText) => (StatusCode::BAD_REQUEST, "No text".to_string()),
            ApiError::Scan(ScanError::Recognition(e)) => {
                error!("OCR failed: {}", e);
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            ApiError::Scan(e @ (ScanError::Classification(_) | ScanError::Internal(_))) => {
                error!("Scan failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::MissingFile => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Upload(e) => (e.status(), e.body_text()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Serialize)]
struct HealthReport {
    status: &'static str,
    version: &'static str,
}

/// Build the application router
pub fn router(scanner: Arc<LabelScanner>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/classify", post(classify))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { scanner })
}

/// Serve the router until Ctrl-C
pub async fn serve(addr: SocketAddr, app: Router) -> Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("Label scan server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Handler for `GET /`
async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Label scan API" }))
}

/// Handler for `GET /health`
async fn health() -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Handler for `POST /classify`
async fn classify(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ScanReport>, ApiError> {
    let mut image = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            image = Some(field.bytes().await?);
            break;
        }
    }

    let image = image.ok_or(ApiError::MissingFile)?;
    let report = state.scanner.scan(image.to_vec()).await?;
    Ok(Json(report))
}
