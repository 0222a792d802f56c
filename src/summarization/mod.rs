//! The summarizer capability and the providers that realize it.
//!
//! A provider receives one token-bounded chunk plus a `(max_length, min_length)` range and
//! returns a shorter text. Two backends are available: the hosted inference pipeline
//! (`summarization` task, lengths in tokens) and a local Ollama runtime (lengths expressed as a
//! word budget in the prompt). Providers are bound to model selectors in a
//! [`SummarizerRegistry`] that is built once at startup and injected into the processing layer.

use crate::config::{Config, SummarizationProvider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

const DEFAULT_HUGGINGFACE_URL: &str = "https://api-inference.huggingface.co";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Errors surfaced while attempting abstractive summarization.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider was unreachable or the model is not being served.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
    /// The request violated the capability's preconditions.
    #[error("Invalid summarization request: {0}")]
    InvalidRequest(String),
}

/// Request payload passed to the summarization provider.
#[derive(Debug, Clone)]
pub struct SummarizationRequest {
    /// Provider-specific model identifier.
    pub model: String,
    /// Chunk text to summarize.
    pub text: String,
    /// Upper bound on the summary length.
    pub max_length: usize,
    /// Lower bound on the summary length.
    pub min_length: usize,
}

impl SummarizationRequest {
    /// Check `0 <= min_length < max_length` and that the text is non-empty.
    pub fn validate(&self) -> Result<(), SummarizationClientError> {
        if self.text.trim().is_empty() {
            return Err(SummarizationClientError::InvalidRequest(
                "text must not be empty".into(),
            ));
        }
        if self.min_length >= self.max_length {
            return Err(SummarizationClientError::InvalidRequest(format!(
                "min_length {} must be lower than max_length {}",
                self.min_length, self.max_length
            )));
        }
        Ok(())
    }
}

/// Interface implemented by abstractive summarization providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Produce a summary of `request.text` within the requested length range.
    async fn summarize(&self, request: SummarizationRequest)
    -> Result<String, SummarizationClientError>;
}

/// A model selector bound to a provider and model identifier.
#[derive(Clone)]
pub struct ModelBinding {
    /// Name callers use to pick this model.
    pub selector: String,
    /// Identifier passed to the provider.
    pub model: String,
    /// Provider that serves the model.
    pub client: Arc<dyn SummarizationClient>,
}

impl std::fmt::Debug for ModelBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBinding")
            .field("selector", &self.selector)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Closed set of model selectors available to the processing layer.
#[derive(Debug, Clone)]
pub struct SummarizerRegistry {
    bindings: Vec<ModelBinding>,
    default_selector: String,
}

impl SummarizerRegistry {
    /// Create an empty registry whose fallback selector is `default_selector`.
    pub fn new(default_selector: impl Into<String>) -> Self {
        Self {
            bindings: Vec::new(),
            default_selector: default_selector.into(),
        }
    }

    /// Bind `selector` to `model` served by `client`, replacing any previous binding.
    pub fn register(
        &mut self,
        selector: impl Into<String>,
        model: impl Into<String>,
        client: Arc<dyn SummarizationClient>,
    ) {
        let selector = selector.into();
        self.bindings.retain(|binding| binding.selector != selector);
        self.bindings.push(ModelBinding {
            selector,
            model: model.into(),
            client,
        });
    }

    /// Build the registry described by the configured provider and model list.
    ///
    /// Every selector shares one provider client.
    pub fn from_config(config: &Config) -> Result<Self, SummarizationClientError> {
        let client: Arc<dyn SummarizationClient> = match config.summarization_provider {
            SummarizationProvider::HuggingFace => {
                let base_url = config
                    .huggingface_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_HUGGINGFACE_URL.to_string());
                Arc::new(HuggingFaceSummarizationClient::new(
                    base_url,
                    config.huggingface_api_token.clone(),
                )?)
            }
            SummarizationProvider::Ollama => {
                let base_url = config
                    .ollama_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
                Arc::new(OllamaSummarizationClient::new(base_url)?)
            }
        };

        let mut registry = Self::new(config.summarization_default_model.clone());
        for entry in &config.summarization_models {
            registry.register(entry.selector.clone(), entry.model.clone(), client.clone());
        }
        tracing::info!(
            provider = ?config.summarization_provider,
            models = registry.bindings.len(),
            default_model = %registry.default_selector,
            "Summarizer registry ready"
        );
        Ok(registry)
    }

    /// Look up a binding; `None` selects the default.
    pub fn resolve(&self, selector: Option<&str>) -> Option<&ModelBinding> {
        let wanted = selector
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(&self.default_selector);
        self.bindings
            .iter()
            .find(|binding| binding.selector == wanted)
    }

    /// Selectors in registration order.
    pub fn selectors(&self) -> Vec<String> {
        self.bindings
            .iter()
            .map(|binding| binding.selector.clone())
            .collect()
    }

    /// Selector used when callers name none.
    pub fn default_selector(&self) -> &str {
        &self.default_selector
    }
}

/// Client for the hosted inference API's `summarization` pipeline.
pub struct HuggingFaceSummarizationClient {
    http: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HuggingFaceSummarizationClient {
    /// Create a client against `base_url`, authenticating with `api_token` when present.
    pub fn new(
        base_url: impl Into<String>,
        api_token: Option<String>,
    ) -> Result<Self, SummarizationClientError> {
        let http = Client::builder()
            .user_agent("docsum/summary")
            .build()
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to construct HTTP client: {error}"
                ))
            })?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_token,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}", self.base_url.trim_end_matches('/'), model)
    }
}

#[derive(Debug, Deserialize)]
struct PipelineSummary {
    summary_text: String,
}

#[async_trait]
impl SummarizationClient for HuggingFaceSummarizationClient {
    async fn summarize(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        request.validate()?;
        let endpoint = self.endpoint(&request.model);
        let payload = json!({
            "inputs": request.text,
            "parameters": {
                "max_length": request.max_length,
                "min_length": request.min_length,
                "do_sample": false,
            },
            "options": {
                "wait_for_model": true,
            }
        });

        let mut builder = self.http.post(&endpoint).json(&payload);
        if let Some(token) = self.api_token.as_deref() {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|error| {
            SummarizationClientError::ProviderUnavailable(format!(
                "failed to reach inference API at {}: {error}",
                self.base_url
            ))
        })?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::NOT_FOUND | StatusCode::SERVICE_UNAVAILABLE
        ) {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::ProviderUnavailable(format!(
                "model endpoint {endpoint} returned {status}: {body}"
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "inference API returned {status}: {body}"
            )));
        }

        let body: Vec<PipelineSummary> = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode pipeline response: {error}"
            ))
        })?;

        body.into_iter()
            .next()
            .map(|item| item.summary_text.trim().to_string())
            .ok_or_else(|| {
                SummarizationClientError::InvalidResponse("pipeline returned no summaries".into())
            })
    }
}

/// Client for a local Ollama runtime.
pub struct OllamaSummarizationClient {
    http: Client,
    base_url: String,
}

impl OllamaSummarizationClient {
    /// Create a client against the Ollama runtime at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, SummarizationClientError> {
        let http = Client::builder()
            .user_agent("docsum/summary")
            .build()
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to construct HTTP client: {error}"
                ))
            })?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

fn build_prompt(request: &SummarizationRequest) -> String {
    format!(
        "Summarize the following text in a single paragraph of {min} to {max} words. \
Do not add information that is not in the text.\n\n{text}",
        min = request.min_length,
        max = request.max_length,
        text = request.text.trim()
    )
}

#[async_trait]
impl SummarizationClient for OllamaSummarizationClient {
    async fn summarize(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        request.validate()?;
        let payload = json!({
            "model": request.model,
            "prompt": build_prompt(&request),
            "stream": false,
            "options": {
                "temperature": 0.0,
                // Roughly two tokens per word keeps the ceiling above the word budget.
                "num_predict": request.max_length * 2,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SummarizationClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(SummarizationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use httpmock::{Method::POST, MockServer};

    fn request() -> SummarizationRequest {
        SummarizationRequest {
            model: "bart".into(),
            text: "A long passage about something.".into(),
            max_length: 30,
            min_length: 20,
        }
    }

    #[tokio::test]
    async fn huggingface_client_sends_length_bounds() {
        let server = MockServer::start_async().await;
        let client =
            HuggingFaceSummarizationClient::new(server.base_url(), Some("secret".into()))
                .expect("client");

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/bart")
                    .header("authorization", "Bearer secret")
                    .json_body_partial(
                        r#"{"parameters":{"max_length":30,"min_length":20,"do_sample":false}}"#,
                    );
                then.status(200)
                    .json_body(json!([{ "summary_text": " Short version. " }]));
            })
            .await;

        let summary = client.summarize(request()).await.expect("summary");
        mock.assert_async().await;
        assert_eq!(summary, "Short version.");
    }

    #[tokio::test]
    async fn huggingface_client_maps_loading_model_to_unavailable() {
        let server = MockServer::start_async().await;
        let client = HuggingFaceSummarizationClient::new(server.base_url(), None).expect("client");
        server
            .mock_async(|when, then| {
                when.method(POST).path("/models/bart");
                then.status(503).body("loading");
            })
            .await;

        let error = client.summarize(request()).await.expect_err("unavailable");
        assert!(matches!(error, SummarizationClientError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn huggingface_client_rejects_empty_pipeline_output() {
        let server = MockServer::start_async().await;
        let client = HuggingFaceSummarizationClient::new(server.base_url(), None).expect("client");
        server
            .mock_async(|when, then| {
                when.method(POST).path("/models/bart");
                then.status(200).json_body(json!([]));
            })
            .await;

        let error = client.summarize(request()).await.expect_err("invalid");
        assert!(matches!(error, SummarizationClientError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn ollama_client_handles_successful_response() {
        let server = MockServer::start_async().await;
        let client = OllamaSummarizationClient::new(server.base_url()).expect("client");

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .body_contains("20 to 30 words");
                then.status(200).json_body(json!({
                    "response": "Summary text",
                    "done": true
                }));
            })
            .await;

        let summary = client.summarize(request()).await.expect("summary");
        mock.assert_async().await;
        assert_eq!(summary, "Summary text");
    }

    #[tokio::test]
    async fn ollama_client_handles_error_status() {
        let server = MockServer::start_async().await;
        let client = OllamaSummarizationClient::new(server.base_url()).expect("client");

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = client.summarize(request()).await.expect_err("error response");
        assert!(
            matches!(error, SummarizationClientError::GenerationFailed(ref message) if message.contains("500"))
        );
    }

    #[tokio::test]
    async fn clients_refuse_inverted_bounds_without_calling_out() {
        let client = OllamaSummarizationClient::new("http://127.0.0.1:9").expect("client");
        let mut bad = request();
        bad.min_length = 30;
        let error = client.summarize(bad).await.expect_err("invalid");
        assert!(matches!(error, SummarizationClientError::InvalidRequest(_)));
    }

    #[test]
    fn registry_resolves_default_and_named_selectors() {
        let mut config = test_config();
        config.summarization_models = crate::config::parse_model_entries("default=bart,t5=t5-small")
            .expect("models");
        let registry = SummarizerRegistry::from_config(&config).expect("registry");

        assert_eq!(registry.resolve(None).expect("default").model, "bart");
        assert_eq!(registry.resolve(Some(" t5 ")).expect("t5").model, "t5-small");
        assert!(registry.resolve(Some("unknown")).is_none());
        assert_eq!(registry.selectors(), vec!["default", "t5"]);
    }
}
