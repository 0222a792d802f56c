//! Document summarization pipeline: segmenting, length planning, and summary assembly.

pub mod chunking;
pub mod length;
mod service;
pub mod types;

pub use chunking::{
    ChunkingStrategy, chunk_by_characters, chunk_by_tokens, chunk_by_words, count_words,
};
pub use length::{LengthBounds, LengthPolicy};
pub use service::{SummarizationApi, SummarySettings, SummaryService};
pub use types::{ModelCatalog, SummarizeError, SummaryOutcome};
