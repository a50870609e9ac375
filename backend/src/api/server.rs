//! HTTP server for the grade spreadsheet upload page.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | POST   | `/api/upload`     | Upload a spreadsheet and run the pipeline |
//! | GET    | `/download`       | Download a generated extract         |
//! | GET    | `/api/extracts`   | List stored extracts                 |
//! | GET    | `/api/logs`       | SSE stream for real-time logs        |

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use chrono::Local;
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

use super::logs::LOG_BROADCASTER;
use super::types::{
    detailed_error_response, error_response, DownloadQuery, ExtractInfo, UploadResponse,
};
use crate::cache::{ExtractKind, ExtractNames, ExtractStore};
use crate::config::{ServerConfig, ALLOWED_EXTENSIONS};
use crate::error::{PipelineError, ServerError, ServerResult, StoreError};
use crate::models::{FormParams, FORM_FIELDS};
use crate::parser::{validate_file_extension, validate_file_size};
use crate::transform::{process_spreadsheet, ExtractOptions};

/// Headroom above the file limit for the multipart envelope and form fields.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Shared server state.
pub struct AppState {
    pub config: ServerConfig,
    pub store: Mutex<ExtractStore>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let store = ExtractStore::with_dir(&config.extract_dir, config.extract_ttl);
        Self {
            config,
            store: Mutex::new(store),
        }
    }
}

/// Build the router over an existing state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    let body_limit = state.config.max_file_size.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload_spreadsheet))
        .route("/download", get(download_extract))
        .route("/api/extracts", get(list_extracts))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Periodically drop expired extracts.
pub fn spawn_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    let period = state.config.sweep_interval.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let removed = state.store.lock().await.sweep();
            debug!(removed, "sweeper tick");
        }
    })
}

/// Start the HTTP server
pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    info!(
        dir = %config.extract_dir.display(),
        ttl_secs = config.extract_ttl.as_secs(),
        max_file_size = config.max_file_size,
        "server configuration"
    );

    let state = Arc::new(AppState::new(config));
    let _sweeper = spawn_sweeper(state.clone());
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("🚀 Gradesheet server running on http://localhost:{}", port);
    info!("   POST /api/upload   - Upload spreadsheet");
    info!("   GET  /download     - Download extract");
    info!("   GET  /api/extracts - List stored extracts");
    info!("   GET  /api/logs     - SSE log stream");
    info!("   GET  /health       - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ServerError::Pipeline(PipelineError::Generation(e)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_response(&format!("Internal server error: {}", e)),
            ),
            ServerError::Pipeline(e) => (
                StatusCode::BAD_REQUEST,
                detailed_error_response(&e.message(), e.details()),
            ),
            ServerError::Store(e @ (StoreError::NotFound(_) | StoreError::MissingFile(_))) => {
                (StatusCode::NOT_FOUND, error_response(&e.to_string()))
            }
            ServerError::Store(e @ StoreError::InvalidKind(_)) => {
                (StatusCode::BAD_REQUEST, error_response(&e.to_string()))
            }
            ServerError::Store(e @ StoreError::Io(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, error_response(&e.to_string()))
            }
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, error_response(msg)),
            ServerError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, error_response(msg)),
        };

        if status.is_server_error() {
            error!(status = %status, "{}", self);
        } else {
            warn!(status = %status, "{}", self);
        }
        (status, Json(body)).into_response()
    }
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "gradesheet",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /api/upload",
            "download": "GET /download?file_id=&file_type=alumnos|notas",
            "extracts": "GET /api/extracts",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Fields collected from the upload form.
#[derive(Debug, Default)]
struct UploadForm {
    file_name: Option<String>,
    file_data: Option<Vec<u8>>,
    params: FormParams,
}

impl UploadForm {
    /// Checks run before the spreadsheet is decoded. Returns the file name
    /// and contents.
    fn validate(self, max_file_size: usize) -> ServerResult<(String, Vec<u8>, FormParams)> {
        let bytes = self
            .file_data
            .ok_or_else(|| ServerError::BadRequest("No file selected".into()))?;

        let filename = self
            .file_name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ServerError::BadRequest("Invalid file".into()))?;

        if !validate_file_size(bytes.len(), max_file_size) {
            return Err(ServerError::BadRequest(format!(
                "File is too large. Maximum size: {}MB",
                max_file_size / (1024 * 1024)
            )));
        }

        if !validate_file_extension(&filename) {
            return Err(ServerError::BadRequest(format!(
                "Invalid file format. Allowed formats: {}",
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }

        let missing = self.params.missing_fields();
        if !missing.is_empty() {
            return Err(ServerError::BadRequest(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        Ok((filename, bytes, self.params))
    }
}

/// Upload spreadsheet endpoint
async fn upload_spreadsheet(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ServerResult<Json<UploadResponse>> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            form.file_name = field.file_name().map(|s| s.to_string());
            form.file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?
                    .to_vec(),
            );
        } else if FORM_FIELDS.contains(&name.as_str()) {
            let value = field
                .text()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
            form.params.set(&name, value);
        }
    }

    let (filename, bytes, params) = form.validate(state.config.max_file_size)?;
    info!(file = %filename, bytes = bytes.len(), "new upload");

    let job_name = filename.clone();
    let job_params = params.clone();
    let output = tokio::task::spawn_blocking(move || {
        process_spreadsheet(&bytes, &job_name, &job_params, &ExtractOptions::default())
    })
    .await
    .map_err(|e| ServerError::Internal(format!("processing task failed: {}", e)))??;

    let names = ExtractNames::for_upload(
        params.commission(),
        params.activity(),
        Local::now().naive_local(),
    );
    let file_id = state
        .store
        .lock()
        .await
        .insert(&output.roster_csv, &output.grades_csv, names)?;

    info!(
        file_id = %file_id,
        records = output.total_records,
        content_errors = output.content_errors.len(),
        "upload processed"
    );

    Ok(Json(UploadResponse::new(
        filename,
        file_id,
        output.total_records,
        output.content_errors,
    )))
}

/// Download a generated extract
async fn download_extract(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DownloadQuery>,
) -> ServerResult<Response> {
    let (file_id, kind) = parse_download_query(query)?;
    let (filename, contents) = state.store.lock().await.read(&file_id, kind)?;
    debug!(file_id = %file_id, kind = kind.as_str(), "serving extract");

    let headers = [
        (header::CONTENT_TYPE, "text/csv".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
        (
            header::CACHE_CONTROL,
            "no-cache, no-store, must-revalidate".to_string(),
        ),
        (header::PRAGMA, "no-cache".to_string()),
        (header::EXPIRES, "0".to_string()),
    ];

    Ok((headers, contents).into_response())
}

fn parse_download_query(query: DownloadQuery) -> ServerResult<(String, ExtractKind)> {
    let file_id = query.file_id.filter(|v| !v.is_empty());
    let file_type = query.file_type.filter(|v| !v.is_empty());

    let (Some(file_id), Some(file_type)) = (file_id, file_type) else {
        return Err(ServerError::BadRequest("Incomplete download parameters".into()));
    };
    let kind: ExtractKind = file_type.parse()?;
    Ok((file_id, kind))
}

/// Diagnostic listing of stored extracts
async fn list_extracts(State(state): State<Arc<AppState>>) -> Json<Value> {
    let store = state.store.lock().await;
    let extracts: Vec<ExtractInfo> = store.list().into_iter().map(ExtractInfo::from).collect();

    Json(json!({
        "count": extracts.len(),
        "ttlSecs": store.ttl().as_secs(),
        "extracts": extracts,
    }))
}
