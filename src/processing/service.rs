//! Summary assembly: segment, plan lengths, summarize each chunk, join in order.

use crate::{
    config::Config,
    metrics::{MetricsSnapshot, SummaryMetrics},
    processing::{
        chunking::ChunkingStrategy,
        length::{LengthBounds, LengthPolicy},
        types::{ModelCatalog, SummarizeError, SummaryOutcome},
    },
    summarization::{ModelBinding, SummarizationRequest, SummarizerRegistry},
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::{sync::Semaphore, task::JoinSet};

/// Tunables for one deployment of the summarization pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarySettings {
    /// Segmenting policy.
    pub chunking: ChunkingStrategy,
    /// Length planning policy.
    pub lengths: LengthPolicy,
    /// Maximum number of chunks summarized at once; `1` is strictly sequential.
    pub concurrency: usize,
    /// Whole-request deadline.
    pub timeout: Option<Duration>,
}

impl SummarySettings {
    /// Derive settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunking: config.chunking_strategy(),
            lengths: config.length_policy(),
            concurrency: config.summary_concurrency,
            timeout: config.summary_timeout(),
        }
    }

    fn validate(&self) -> Result<(), SummarizeError> {
        if self.chunking.size() == 0 {
            return Err(SummarizeError::Configuration(
                "chunk size must be greater than zero".into(),
            ));
        }
        let proportion = self.lengths.proportion;
        if !(proportion > 0.0 && proportion <= 1.0) {
            return Err(SummarizeError::Configuration(format!(
                "length proportion must be in (0, 1], got {proportion}"
            )));
        }
        if self.lengths.max_cap == 0 {
            return Err(SummarizeError::Configuration(
                "maximum length cap must be greater than zero".into(),
            ));
        }
        if self.concurrency == 0 {
            return Err(SummarizeError::Configuration(
                "concurrency must be at least one".into(),
            ));
        }
        Ok(())
    }
}

/// Abstraction over the summarization pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait SummarizationApi: Send + Sync {
    /// Summarize already-extracted text with the selected model.
    async fn summarize_text(
        &self,
        text: String,
        model: Option<String>,
    ) -> Result<SummaryOutcome, SummarizeError>;

    /// Enumerate the configured model selectors.
    fn model_catalog(&self) -> ModelCatalog;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Drives the segmenter and length planner across a document and assembles the summary.
///
/// The model registry is injected at construction so the service never owns provider
/// lifecycles. Construct it once near process start and share it through an `Arc`.
pub struct SummaryService {
    registry: Arc<SummarizerRegistry>,
    settings: SummarySettings,
    metrics: Arc<SummaryMetrics>,
}

/// One segment of the document together with its planned length range.
struct ChunkPlan {
    index: usize,
    text: String,
    bounds: LengthBounds,
}

impl SummaryService {
    /// Build a service from an explicit registry and settings.
    pub fn new(
        registry: Arc<SummarizerRegistry>,
        settings: SummarySettings,
    ) -> Result<Self, SummarizeError> {
        settings.validate()?;
        let default_selector = registry.default_selector();
        if registry.resolve(None).is_none() {
            return Err(SummarizeError::Configuration(format!(
                "default model selector '{default_selector}' is not registered"
            )));
        }
        Ok(Self {
            registry,
            settings,
            metrics: Arc::new(SummaryMetrics::new()),
        })
    }

    /// Build the registry and settings described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, SummarizeError> {
        let registry = SummarizerRegistry::from_config(config)
            .map_err(|error| SummarizeError::Configuration(error.to_string()))?;
        Self::new(Arc::new(registry), SummarySettings::from_config(config))
    }

    /// Settings this service was built with.
    pub fn settings(&self) -> &SummarySettings {
        &self.settings
    }

    /// Summarize `text` with the model named by `selector` (or the default).
    ///
    /// Fails with `UnsupportedModel` before segmenting, and with `EmptyInput` before any
    /// summarizer call. Any chunk failure aborts the request; no partial summary is returned.
    pub async fn summarize(
        &self,
        text: &str,
        selector: Option<&str>,
    ) -> Result<SummaryOutcome, SummarizeError> {
        let result = match self.settings.timeout {
            Some(deadline) => tokio::time::timeout(deadline, self.run(text, selector))
                .await
                .unwrap_or(Err(SummarizeError::Timeout { elapsed: deadline })),
            None => self.run(text, selector).await,
        };

        if let Err(error) = &result {
            self.metrics.record_failure();
            tracing::warn!(error = %error, "Summarization failed");
        }
        result
    }

    async fn run(&self, text: &str, selector: Option<&str>) -> Result<SummaryOutcome, SummarizeError> {
        let binding = self.registry.resolve(selector).ok_or_else(|| {
            SummarizeError::UnsupportedModel {
                selector: selector
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .unwrap_or(self.registry.default_selector())
                    .to_string(),
            }
        })?;

        if text.trim().is_empty() {
            return Err(SummarizeError::EmptyInput);
        }

        let plans = self.plan(text);
        let chunk_count = plans.len();
        let verbatim_chunks = plans
            .iter()
            .filter(|plan| !plan.bounds.is_summarizable())
            .count();
        tracing::info!(
            model = %binding.selector,
            chunk_count,
            verbatim_chunks,
            unit = self.settings.chunking.unit().label(),
            chunk_size = self.settings.chunking.size(),
            concurrency = self.settings.concurrency,
            "Summarizing document"
        );

        let partials = if self.settings.concurrency <= 1 || chunk_count <= 1 {
            summarize_sequential(binding, plans).await?
        } else {
            summarize_concurrent(binding, plans, self.settings.concurrency).await?
        };

        self.metrics.record_document(
            (chunk_count - verbatim_chunks) as u64,
            verbatim_chunks as u64,
        );

        let summary = partials.join(" ");
        tracing::info!(
            model = %binding.selector,
            chunk_count,
            summary_chars = summary.len(),
            "Document summarized"
        );

        Ok(SummaryOutcome {
            summary,
            model: binding.selector.clone(),
            chunk_count,
            verbatim_chunks,
            chunking: self.settings.chunking.clone(),
        })
    }

    fn plan(&self, text: &str) -> Vec<ChunkPlan> {
        self.settings
            .chunking
            .segment(text)
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let bounds = self.settings.lengths.bounds_for(&text);
                ChunkPlan {
                    index,
                    text,
                    bounds,
                }
            })
            .collect()
    }

    /// Return the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Configured selectors and the default.
    pub fn model_catalog(&self) -> ModelCatalog {
        ModelCatalog {
            models: self.registry.selectors(),
            default: self.registry.default_selector().to_string(),
        }
    }
}

async fn summarize_sequential(
    binding: &ModelBinding,
    plans: Vec<ChunkPlan>,
) -> Result<Vec<String>, SummarizeError> {
    let mut partials = Vec::with_capacity(plans.len());
    for plan in plans {
        partials.push(summarize_chunk(binding, plan).await?);
    }
    Ok(partials)
}

/// Fan chunks out to at most `concurrency` in-flight calls and reassemble them by index.
///
/// Returning early drops the `JoinSet`, which aborts the remaining calls.
async fn summarize_concurrent(
    binding: &ModelBinding,
    plans: Vec<ChunkPlan>,
    concurrency: usize,
) -> Result<Vec<String>, SummarizeError> {
    let total = plans.len();
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut set = JoinSet::new();

    for plan in plans {
        let semaphore = semaphore.clone();
        let binding = binding.clone();
        set.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|error| SummarizeError::Internal(error.to_string()))?;
            let index = plan.index;
            summarize_chunk(&binding, plan)
                .await
                .map(|partial| (index, partial))
        });
    }

    let mut partials = Vec::with_capacity(total);
    while let Some(joined) = set.join_next().await {
        let item = joined.map_err(|error| {
            SummarizeError::Internal(format!("summary task failed to complete: {error}"))
        })??;
        partials.push(item);
    }
    partials.sort_by_key(|(index, _)| *index);
    Ok(partials.into_iter().map(|(_, partial)| partial).collect())
}

async fn summarize_chunk(binding: &ModelBinding, plan: ChunkPlan) -> Result<String, SummarizeError> {
    let ChunkPlan {
        index,
        text,
        bounds,
    } = plan;

    if !bounds.is_summarizable() {
        tracing::debug!(
            chunk_index = index,
            words = crate::processing::chunking::count_words(&text),
            "Chunk too short to summarize; passing through verbatim"
        );
        return Ok(text);
    }
    bounds.ensure_valid(index)?;

    tracing::debug!(
        chunk_index = index,
        max_length = bounds.max_length,
        min_length = bounds.min_length,
        "Summarizing chunk"
    );
    binding
        .client
        .summarize(SummarizationRequest {
            model: binding.model.clone(),
            text,
            max_length: bounds.max_length,
            min_length: bounds.min_length,
        })
        .await
        .map_err(|source| SummarizeError::SummarizerFailure {
            chunk_index: index,
            source,
        })
}

#[async_trait]
impl SummarizationApi for SummaryService {
    async fn summarize_text(
        &self,
        text: String,
        model: Option<String>,
    ) -> Result<SummaryOutcome, SummarizeError> {
        SummaryService::summarize(self, &text, model.as_deref()).await
    }

    fn model_catalog(&self) -> ModelCatalog {
        SummaryService::model_catalog(self)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        SummaryService::metrics_snapshot(self)
    }
}
