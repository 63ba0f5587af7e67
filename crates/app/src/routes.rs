use crate::error::ApiError;
use crate::schemas::{ChatRequest, ChatResponse, DocumentsResponse, UploadResponse};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    http::HeaderValue,
    routing::{get, post},
    Json, Router,
};
use finqa_core::{is_pdf_file_name, Chunk};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub fn router(state: AppState) -> Router {
    let max_upload = state.settings().max_upload_bytes;
    let cors = cors_layer(&state.settings().allowed_origins);

    Router::new()
        .route("/", get(root))
        .route(
            "/api/upload",
            post(upload_pdf).layer(DefaultBodyLimit::max(max_upload)),
        )
        .route("/api/chat", post(chat))
        .route("/api/documents", get(list_documents))
        .route("/api/chunks", get(list_chunks))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid cors origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Financial statement RAG API is running" }))
}

async fn upload_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::Validation("file field has no file name".to_string()))?;
        if !is_pdf_file_name(&filename) {
            return Err(ApiError::Validation("File must be a PDF".to_string()));
        }

        let bytes = field.bytes().await?;
        info!(filename = %filename, bytes = bytes.len(), "received upload");
        let document = state.ingestor().ingest_upload(&filename, &bytes).await?;
        return Ok(Json(UploadResponse::from(document)));
    }

    Err(ApiError::Validation(
        "multipart field `file` is required".to_string(),
    ))
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;
    let history = request.chat_history.unwrap_or_default();

    let answer = state.pipeline().answer(&request.question, &history).await?;
    Ok(Json(ChatResponse::from(answer.into_result())))
}

async fn list_documents(State(state): State<AppState>) -> Json<DocumentsResponse> {
    Json(DocumentsResponse {
        documents: state.registry().list().await,
    })
}

async fn list_chunks(State(state): State<AppState>) -> Result<Json<Vec<Chunk>>, ApiError> {
    Ok(Json(state.store().all_chunks().await?))
}
