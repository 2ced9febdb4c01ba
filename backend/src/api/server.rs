//! HTTP Server for the colscript API.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | POST   | `/api/transform`  | Upload CSV and run a column script   |
//! | GET    | `/api/scripts`    | Scripts stored in the registry       |
//! | GET    | `/api/logs`       | SSE stream for real-time logs        |
//!
//! `/api/transform` takes a multipart form with `file`, `columns`
//! (optional when the script names its own selection), an optional
//! `delimiter`, and either `script` (JSON) or `scriptId`.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use super::logs::{log_info, log_success, LOG_BROADCASTER};
use super::types::{error_response, TransformResponse};
use crate::cache::{ScriptRegistry, StoredScript};
use crate::config::Config;
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::transform::dsl::DslScript;
use crate::transform::pipeline::{resolve_selection, transform_upload};

/// Shared state of all handlers
#[derive(Clone)]
pub struct AppState {
    registry: Arc<Mutex<ScriptRegistry>>,
}

impl AppState {
    pub fn new(registry: ScriptRegistry) -> Self {
        Self {
            registry: Arc::new(Mutex::new(registry)),
        }
    }

    fn with_registry<T>(
        &self,
        f: impl FnOnce(&mut ScriptRegistry) -> ServerResult<T>,
    ) -> ServerResult<T> {
        let mut registry = self
            .registry
            .lock()
            .map_err(|_| ServerError::Internal("script registry lock poisoned".to_string()))?;
        f(&mut registry)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (status_for(&self), Json(error_response(&self.to_string()))).into_response()
    }
}

/// 400 for problems with the request, 500 for problems with the host.
pub fn status_for(err: &ServerError) -> StatusCode {
    match err {
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Pipeline(e) if e.is_caller_error() => StatusCode::BAD_REQUEST,
        ServerError::Pipeline(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Build the router.
pub fn router(state: AppState, max_upload: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/transform", post(transform_csv))
        .route("/api/scripts", get(list_scripts))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::new(ScriptRegistry::with_dir(&config.registry_dir));
    let app = router(state, config.max_upload);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    println!("colscript server running on http://localhost:{}", config.port);
    println!("   POST /api/transform - Upload CSV and run a script");
    println!("   GET  /api/scripts   - Stored scripts");
    println!("   GET  /api/logs      - SSE log stream");
    println!("   GET  /health        - Health check");
    println!("   Registry: {}", config.registry_dir.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "colscript",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "transform": "POST /api/transform",
            "scripts": "GET /api/scripts",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn list_scripts(State(state): State<AppState>) -> ServerResult<Json<Vec<StoredScript>>> {
    let scripts = state.with_registry(|r| Ok(r.list().into_iter().cloned().collect()))?;
    Ok(Json(scripts))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers skip what they missed
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

/// Fields of a transform request
#[derive(Debug, Default)]
struct TransformForm {
    file_name: Option<String>,
    file: Option<Vec<u8>>,
    columns: Option<String>,
    delimiter: Option<String>,
    script: Option<String>,
    script_id: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> ServerResult<TransformForm> {
    let bad = |e: axum::extract::multipart::MultipartError| {
        ServerError::BadRequest(format!("Multipart error: {}", e))
    };
    let mut form = TransformForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                form.file_name = field.file_name().map(str::to_string);
                form.file = Some(field.bytes().await.map_err(bad)?.to_vec());
            }
            "columns" => form.columns = Some(field.text().await.map_err(bad)?),
            "delimiter" => form.delimiter = Some(field.text().await.map_err(bad)?),
            "script" => form.script = Some(field.text().await.map_err(bad)?),
            "scriptId" => form.script_id = Some(field.text().await.map_err(bad)?),
            _ => {}
        }
    }
    Ok(form)
}

fn parse_delimiter(text: Option<&str>) -> ServerResult<Option<char>> {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    if text.eq_ignore_ascii_case("tab") || text == "\\t" {
        return Ok(Some('\t'));
    }
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Some(c)),
        _ => Err(ServerError::BadRequest(format!(
            "delimiter must be a single character, got '{}'",
            text
        ))),
    }
}

/// Upload CSV and transform endpoint
async fn transform_csv(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ServerResult<Json<TransformResponse>> {
    let form = read_form(multipart).await?;
    let bytes = form
        .file
        .ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;
    let delimiter = parse_delimiter(form.delimiter.as_deref())?;

    let script = match (form.script.as_deref(), form.script_id.as_deref()) {
        (Some(json), _) => DslScript::from_json(json).map_err(PipelineError::from)?,
        (None, Some(id)) => {
            state.with_registry(|r| Ok(r.load_script(id).map_err(PipelineError::from)?))?
        }
        (None, None) => {
            return Err(ServerError::BadRequest(
                "Provide either 'script' or 'scriptId'".to_string(),
            ))
        }
    };
    let selection = resolve_selection(form.columns.as_deref(), &script)?;

    let job_id = Uuid::new_v4();
    log_info(format!(
        "Job {}: {} ({} bytes), columns {}",
        job_id,
        form.file_name.as_deref().unwrap_or("unknown"),
        bytes.len(),
        selection.to_text()
    ));

    let output = transform_upload(bytes, selection, script, delimiter).await?;

    // Inline scripts win over stored ones
    let script_id = form.script_id.filter(|_| form.script.is_none());
    if let Some(id) = script_id.as_deref() {
        state.with_registry(|r| Ok(r.record_use(id).map_err(PipelineError::from)?))?;
    }

    log_success(format!("Job {}: {} rows", job_id, output.row_count));
    let response = TransformResponse::new(job_id, output, script_id)?;
    Ok(Json(response))
}
