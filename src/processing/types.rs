//! Error taxonomy and result types for the summarization pipeline.

use super::chunking::ChunkingStrategy;
use crate::summarization::SummarizationClientError;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors emitted while summarizing a document. Any error aborts the whole request.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Extracted text was empty or whitespace-only.
    #[error("The document is empty or its text could not be extracted")]
    EmptyInput,
    /// The model selector is not part of the configured set.
    #[error("Unsupported model selector '{selector}'")]
    UnsupportedModel {
        /// Selector supplied by the caller.
        selector: String,
    },
    /// Length planning produced `min_length >= max_length`.
    #[error("Invalid length bounds for chunk {chunk_index}: min {min_length} >= max {max_length}")]
    InvalidLengthBounds {
        /// Zero-based index of the offending chunk.
        chunk_index: usize,
        /// Computed maximum length.
        max_length: usize,
        /// Computed minimum length.
        min_length: usize,
    },
    /// The summarizer failed for a chunk.
    #[error("Summarizer failed on chunk {chunk_index}: {source}")]
    SummarizerFailure {
        /// Zero-based index of the failing chunk.
        chunk_index: usize,
        /// Underlying provider error.
        source: SummarizationClientError,
    },
    /// The request exceeded its deadline; in-flight calls were cancelled.
    #[error("Summarization timed out after {elapsed:?}")]
    Timeout {
        /// Deadline that elapsed.
        elapsed: Duration,
    },
    /// Pipeline settings are unusable.
    #[error("Invalid summarization settings: {0}")]
    Configuration(String),
    /// A summary task panicked or was torn down before it reported a result.
    #[error("Internal summarization error: {0}")]
    Internal(String),
}

/// Result of a completed summarization produced by [`crate::processing::SummaryService::summarize`].
#[derive(Debug, Clone, Serialize)]
pub struct SummaryOutcome {
    /// Partial summaries joined with single spaces, in chunk order.
    pub summary: String,
    /// Selector of the model that produced the summary.
    pub model: String,
    /// Number of chunks produced by the segmenter.
    pub chunk_count: usize,
    /// Chunks passed through verbatim because they were too short to summarize.
    pub verbatim_chunks: usize,
    /// Segmenting policy applied to the document.
    pub chunking: ChunkingStrategy,
}

/// Model selectors exposed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct ModelCatalog {
    /// Configured selectors, in declaration order.
    pub models: Vec<String>,
    /// Selector used when a request names none.
    pub default: String,
}
