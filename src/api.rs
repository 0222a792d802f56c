//! HTTP surface for the document summarizer.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /summarize` – Summarize raw text. Accepts `{ "text", "model"? }` and returns the
//!   summary together with the model selector, chunk counters, and the chunking policy used.
//! - `POST /upload` – Multipart upload (`file` part, optional `model` part). The file is
//!   converted to text by extension (pdf, docx, pptx, txt, md) and summarized.
//! - `GET /models` – Configured model selectors and the default.
//! - `GET /metrics` – Observe summarization counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Errors are always returned as `{ "error": message }`.

use crate::extraction::{self, ExtractionError};
use crate::metrics::MetricsSnapshot;
use crate::processing::{ModelCatalog, SummarizationApi, SummarizeError, SummaryOutcome};
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the summarization API surface.
///
/// `upload_limit` caps the multipart body accepted by `POST /upload`.
pub fn create_router<S>(service: Arc<S>, upload_limit: usize) -> Router
where
    S: SummarizationApi + 'static,
{
    Router::new()
        .route("/summarize", post(summarize_text::<S>))
        .route(
            "/upload",
            post(upload_document::<S>).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/models", get(list_models::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Request body for the `POST /summarize` endpoint.
#[derive(Deserialize)]
struct SummarizeRequest {
    /// Document text to summarize.
    text: String,
    /// Optional model selector (defaults to `SUMMARIZATION_DEFAULT_MODEL`).
    #[serde(default)]
    model: Option<String>,
}

/// Summarize raw text.
async fn summarize_text<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummaryOutcome>, AppError>
where
    S: SummarizationApi,
{
    let Json(request) = payload?;
    let SummarizeRequest { text, model } = request;
    let outcome = service.summarize_text(text, model).await?;
    tracing::info!(
        model = outcome.model,
        chunks = outcome.chunk_count,
        verbatim_chunks = outcome.verbatim_chunks,
        "Summarize request completed"
    );
    Ok(Json(outcome))
}

/// Extract text from an uploaded document and summarize it.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SummaryOutcome>, AppError>
where
    S: SummarizationApi,
{
    let mut multipart = multipart?;
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut model: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                upload = Some((file_name, bytes.to_vec()));
            }
            Some("model") => {
                let value = field.text().await?;
                model = Some(value).filter(|value| !value.trim().is_empty());
            }
            _ => {}
        }
    }

    let (file_name, bytes) = upload.ok_or_else(|| AppError::BadRequest("No file part".into()))?;
    if file_name.trim().is_empty() {
        return Err(AppError::BadRequest("No selected file".into()));
    }

    tracing::info!(file_name, bytes = bytes.len(), "Document upload received");
    let text = tokio::task::spawn_blocking({
        let file_name = file_name.clone();
        move || extraction::extract_text(&file_name, &bytes)
    })
    .await
    .map_err(|err| AppError::Internal(format!("extraction task failed: {err}")))??;

    let outcome = service.summarize_text(text, model).await?;
    tracing::info!(
        file_name,
        model = outcome.model,
        chunks = outcome.chunk_count,
        "Upload summarized"
    );
    Ok(Json(outcome))
}

/// List configured model selectors.
async fn list_models<S>(State(service): State<Arc<S>>) -> Json<ModelCatalog>
where
    S: SummarizationApi,
{
    Json(service.model_catalog())
}

/// Return a concise metrics snapshot with summarization counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: SummarizationApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/summarize",
                description: "Chunk a document, summarize each chunk with the selected model, and join the partial summaries in order.",
                request_example: Some(json!({
                    "text": "Document contents",
                    "model": "default"
                })),
            },
            CommandDescriptor {
                name: "upload",
                method: "POST",
                path: "/upload",
                description: "Multipart upload with a `file` part (pdf, docx, pptx, txt, md) and an optional `model` part. Returns the same body as /summarize.",
                request_example: None,
            },
            CommandDescriptor {
                name: "models",
                method: "GET",
                path: "/models",
                description: "Return the configured model selectors and the default selector.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return summarization counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    BadRequest(String),
    /// Extractor or body-stream failure; keeps the status axum assigned (e.g. 413).
    Rejected {
        status: StatusCode,
        message: String,
    },
    Summarize(SummarizeError),
    Extraction(ExtractionError),
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Rejected { status, .. } => *status,
            Self::Summarize(err) => match err {
                SummarizeError::EmptyInput | SummarizeError::UnsupportedModel { .. } => {
                    StatusCode::BAD_REQUEST
                }
                SummarizeError::SummarizerFailure { .. } => StatusCode::BAD_GATEWAY,
                SummarizeError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                SummarizeError::InvalidLengthBounds { .. }
                | SummarizeError::Configuration(_)
                | SummarizeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Extraction(err) if err.is_unsupported() => StatusCode::BAD_REQUEST,
            Self::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::BadRequest(message)
            | Self::Internal(message)
            | Self::Rejected { message, .. } => message.clone(),
            Self::Summarize(err) => err.to_string(),
            Self::Extraction(err) => err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "Request failed");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<SummarizeError> for AppError {
    fn from(inner: SummarizeError) -> Self {
        Self::Summarize(inner)
    }
}

impl From<ExtractionError> for AppError {
    fn from(inner: ExtractionError) -> Self {
        Self::Extraction(inner)
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::Rejected {
            status: inner.status(),
            message: inner.body_text(),
        }
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}
