//! HTTP transport surface for the RAG pipeline.
//!
//! Exposes the pipeline over axum: `POST /upload` ingests a multipart
//! document, `POST /chat` answers a query (buffered JSON or an SSE
//! fragment stream), `GET /` is a health probe. CORS is permissive, as
//! a demo frontend expects. Only available when the `server` feature is
//! enabled.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::error::RagError;
use crate::generation::AnswerStream;
use crate::pipeline::RagPipeline;

/// Maximum accepted upload size (32 MiB).
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Build the HTTP router over a shared pipeline handle.
pub fn router(pipeline: Arc<RagPipeline>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/upload", post(upload))
        .route("/chat", post(chat))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "message": "API is running" }))
}

#[derive(Deserialize)]
struct ChatRequest {
    query: String,
    #[serde(default)]
    stream: bool,
}

async fn upload(
    State(pipeline): State<Arc<RagPipeline>>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(ToOwned::to_owned)
            .ok_or_else(|| ApiError::BadRequest("'file' field must carry a filename".into()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;

        let receipt = pipeline.ingest(&filename, &bytes).await?;
        return Ok(Json(json!({
            "message": "File uploaded and indexed",
            "filename": receipt.id,
            "chars": receipt.chars,
        })));
    }

    Err(ApiError::BadRequest("multipart body must include a 'file' field".into()))
}

async fn chat(
    State(pipeline): State<Arc<RagPipeline>>,
    Form(request): Form<ChatRequest>,
) -> Result<Response, ApiError> {
    if request.stream {
        let answer = pipeline.answer_stream(&request.query).await?;
        Ok(sse_response(answer).into_response())
    } else {
        let response = pipeline.answer(&request.query).await?;
        Ok(Json(json!({ "response": response })).into_response())
    }
}

/// Frame answer fragments as SSE: one `data:` event per fragment, no
/// terminal event. Fragments already delivered before a mid-stream
/// failure stand; the failure itself becomes a final `error` event.
fn sse_response(answer: AnswerStream) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = answer.map(|fragment| match fragment {
        Ok(text) => Ok(Event::default().data(text)),
        Err(e) => {
            error!(error = %e, "generation stream failed mid-answer");
            Ok(Event::default().event("error").data(e.to_string()))
        }
    });
    Sse::new(stream)
}

/// Request failure as seen by HTTP clients: a status code plus a stable
/// error class and human-readable message.
enum ApiError {
    Rag(RagError),
    BadRequest(String),
}

impl From<RagError> for ApiError {
    fn from(e: RagError) -> Self {
        Self::Rag(e)
    }
}

fn classify(error: &RagError) -> (StatusCode, &'static str) {
    match error {
        RagError::Extraction(_) => (StatusCode::BAD_REQUEST, "extraction_error"),
        RagError::Config(_) => (StatusCode::BAD_REQUEST, "config_error"),
        RagError::ProviderUnavailable { .. } => (StatusCode::BAD_GATEWAY, "provider_unavailable"),
        RagError::GenerationService(_) => (StatusCode::BAD_GATEWAY, "generation_service_error"),
        RagError::IndexBackend { .. } => (StatusCode::BAD_GATEWAY, "index_backend_error"),
        RagError::InvalidEmbeddingFormat(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "invalid_embedding_format")
        }
        RagError::DimensionMismatch { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "dimension_mismatch")
        }
        RagError::IndexProvisioning(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "index_provisioning_error")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, class, message) = match self {
            Self::Rag(e) => {
                error!(error = %e, "request failed");
                let (status, class) = classify(&e);
                (status, class, e.to_string())
            }
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, "bad_request", message),
        };
        (status, Json(json!({ "error": class, "message": message }))).into_response()
    }
}
