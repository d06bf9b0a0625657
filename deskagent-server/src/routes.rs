//! HTTP routes: document upload, chat, and health.
//!
//! Every response is wrapped in a uniform `{success, data|error,
//! request_id}` envelope; the request id is also attached to the tracing
//! span for the request. The core pipeline never leaks raw errors here:
//! the only pipeline error a handler maps itself is the empty-query
//! `Input` case, which becomes a 400.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, warn};
use uuid::Uuid;

use deskagent_core::{
    ChunkRecord, DocumentStore, FlatIndex, PipelineError, Supervisor, TableRecord,
};

/// PDF magic bytes; uploads claiming to be a document must start with this.
const PDF_SIGNATURE: &[u8] = b"%PDF";

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<Supervisor>,
    pub started_at: Instant,
}

/// The uniform transport envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub request_id: String,
}

impl ApiResponse {
    fn ok(request_id: &str, data: Value) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
            request_id: request_id.to_string(),
        })
    }

    fn err(request_id: &str, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: false,
            data: None,
            error: Some(message.into()),
            request_id: request_id.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub query: String,
}

/// The hand-off format from the external preprocessing job: chunk
/// metadata, raw tables, and one embedding row per chunk, installed as a
/// single unit.
#[derive(Debug, Deserialize)]
pub struct IngestBundle {
    pub chunks: Vec<ChunkRecord>,
    #[serde(default)]
    pub tables: Vec<TableRecord>,
    pub embeddings: Vec<Vec<f32>>,
}

/// Build the application router.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/upload", post(upload_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let request_id = Uuid::new_v4().to_string();
    // instrument, not enter: a span guard must not be held across awaits.
    let span = tracing::info_span!("chat", request_id = %request_id);
    handle_chat(state, request, &request_id).instrument(span).await
}

async fn handle_chat(
    state: AppState,
    request: ChatRequest,
    request_id: &str,
) -> (StatusCode, Json<ApiResponse>) {
    match state.supervisor.handle(&request.query).await {
        Ok(envelope) => {
            let data = match serde_json::to_value(&envelope) {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize envelope");
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiResponse::err(&request_id, "internal error"),
                    );
                }
            };
            (StatusCode::OK, ApiResponse::ok(&request_id, data))
        }
        Err(PipelineError::Input { message }) => {
            (StatusCode::BAD_REQUEST, ApiResponse::err(&request_id, message))
        }
        Err(e) => {
            // The supervisor folds everything else into envelopes; reaching
            // here means a bug, not a user mistake.
            warn!(error = %e, "Unexpected pipeline error at transport boundary");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiResponse::err(&request_id, "internal error"),
            )
        }
    }
}

async fn upload_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> (StatusCode, Json<ApiResponse>) {
    let request_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!("upload", request_id = %request_id);
    handle_upload(state, multipart, &request_id)
        .instrument(span)
        .await
}

async fn handle_upload(
    state: AppState,
    mut multipart: Multipart,
    request_id: &str,
) -> (StatusCode, Json<ApiResponse>) {
    let mut pdf_seen = false;
    let mut bundle: Option<IngestBundle> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    ApiResponse::err(&request_id, format!("malformed multipart body: {e}")),
                );
            }
        };
        let name = field.name().unwrap_or_default().to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    ApiResponse::err(&request_id, format!("failed to read field '{name}': {e}")),
                );
            }
        };

        match name.as_str() {
            // The raw document. Parsing/OCR is the preprocessing job's
            // concern; here we only enforce the content signature.
            "file" if bytes.starts_with(PDF_SIGNATURE) => pdf_seen = true,
            "file" | "bundle" => match serde_json::from_slice::<IngestBundle>(&bytes) {
                Ok(parsed) => bundle = Some(parsed),
                Err(e) if name == "bundle" => {
                    return (
                        StatusCode::BAD_REQUEST,
                        ApiResponse::err(&request_id, format!("invalid ingest bundle: {e}")),
                    );
                }
                Err(_) => {
                    return (
                        StatusCode::BAD_REQUEST,
                        ApiResponse::err(&request_id, "file is not a valid PDF"),
                    );
                }
            },
            _ => {}
        }
    }

    let Some(bundle) = bundle else {
        let message = if pdf_seen {
            "PDF accepted, but the preprocessing bundle is required to activate the document"
        } else {
            "no document provided"
        };
        return (StatusCode::BAD_REQUEST, ApiResponse::err(&request_id, message));
    };

    if bundle.embeddings.len() != bundle.chunks.len() {
        return (
            StatusCode::BAD_REQUEST,
            ApiResponse::err(
                &request_id,
                format!(
                    "bundle has {} chunks but {} embedding rows",
                    bundle.chunks.len(),
                    bundle.embeddings.len()
                ),
            ),
        );
    }

    let chunks = bundle.chunks.len();
    let tables = bundle.tables.len();
    let store = DocumentStore::new(
        Box::new(FlatIndex::new(bundle.embeddings)),
        bundle.chunks,
        bundle.tables,
    );
    state.supervisor.install_document(store).await;
    info!(chunks, tables, "Active document replaced");

    (
        StatusCode::OK,
        ApiResponse::ok(&request_id, json!({ "chunks": chunks, "tables": tables })),
    )
}

async fn health_handler(State(state): State<AppState>) -> Json<ApiResponse> {
    let request_id = Uuid::new_v4().to_string();
    let data = json!({
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "document_loaded": state.supervisor.has_document().await,
    });
    ApiResponse::ok(&request_id, data)
}
