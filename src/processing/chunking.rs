//! Segmenter policies that split extracted text into bounded chunks.
//!
//! Summarization models accept a fixed input window, so long documents are cut into ordered
//! chunks before any length planning happens. Three policies are available:
//!
//! - Word windows: accumulate whitespace-delimited words until the threshold is reached. Words
//!   inside a chunk are re-joined with single spaces.
//! - Character windows: fixed-size runs of `char`s with no regard for word boundaries. Chunks
//!   concatenate back to the original text exactly.
//! - Token windows: semantic splitting via `semchunk-rs`, bounded by a `tiktoken-rs` counter and
//!   falling back to whitespace counting when the encoding is unknown.
//!
//! Every policy is a pure function: empty input yields no chunks and no chunk is ever empty.

use crate::config::ChunkingUnit;
use anyhow::Error as TokenizerError;
use semchunk_rs::Chunker;
use serde::Serialize;
use std::sync::Arc;
use tiktoken_rs::{
    CoreBPE, cl100k_base, get_bpe_from_model, o200k_base, p50k_base, p50k_edit, r50k_base,
};

type TokenCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Caller-selected segmenting policy together with its size bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "unit", rename_all = "lowercase")]
pub enum ChunkingStrategy {
    /// Split on whitespace and cap each chunk at `max_words` words.
    Words {
        /// Word-count threshold per chunk.
        max_words: usize,
    },
    /// Split into fixed windows of `window` characters.
    Characters {
        /// Character count per window.
        window: usize,
    },
    /// Split semantically with a token budget measured by `tokenizer`.
    Tokens {
        /// Token budget per chunk.
        max_tokens: usize,
        /// tiktoken model or encoding name.
        tokenizer: String,
    },
}

impl ChunkingStrategy {
    /// Build a strategy from a configured unit and threshold.
    pub fn from_unit(unit: ChunkingUnit, size: usize, tokenizer: &str) -> Self {
        match unit {
            ChunkingUnit::Words => Self::Words { max_words: size },
            ChunkingUnit::Characters => Self::Characters { window: size },
            ChunkingUnit::Tokens => Self::Tokens {
                max_tokens: size,
                tokenizer: tokenizer.to_string(),
            },
        }
    }

    /// Unit the size bound is measured in.
    pub fn unit(&self) -> ChunkingUnit {
        match self {
            Self::Words { .. } => ChunkingUnit::Words,
            Self::Characters { .. } => ChunkingUnit::Characters,
            Self::Tokens { .. } => ChunkingUnit::Tokens,
        }
    }

    /// Size bound per chunk, in [`Self::unit`].
    pub fn size(&self) -> usize {
        match self {
            Self::Words { max_words } => *max_words,
            Self::Characters { window } => *window,
            Self::Tokens { max_tokens, .. } => *max_tokens,
        }
    }

    /// Split `text` into ordered, non-empty chunks according to this policy.
    pub fn segment(&self, text: &str) -> Vec<String> {
        match self {
            Self::Words { max_words } => chunk_by_words(text, *max_words),
            Self::Characters { window } => chunk_by_characters(text, *window),
            Self::Tokens {
                max_tokens,
                tokenizer,
            } => chunk_by_tokens(text, *max_tokens, tokenizer),
        }
    }
}

/// Group whitespace-delimited words into chunks of at most `max_words` words.
///
/// A threshold of zero is treated as one. The trailing partial chunk is always emitted.
pub fn chunk_by_words(text: &str, max_words: usize) -> Vec<String> {
    let max_words = max_words.max(1);
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::with_capacity(max_words.min(4096));

    for word in text.split_whitespace() {
        current.push(word);
        if current.len() >= max_words {
            chunks.push(current.join(" "));
            current.clear();
        }
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}

/// Cut `text` into consecutive windows of `window` characters.
///
/// Windows are counted in `char`s so a multi-byte sequence is never split. A window of zero is
/// treated as one. Concatenating the result reproduces `text` byte for byte.
pub fn chunk_by_characters(text: &str, window: usize) -> Vec<String> {
    let window = window.max(1);
    let mut chunks = Vec::with_capacity(text.len() / window + 1);
    let mut start = 0;
    let mut taken = 0;

    for (offset, _) in text.char_indices() {
        if taken == window {
            chunks.push(text[start..offset].to_string());
            start = offset;
            taken = 0;
        }
        taken += 1;
    }

    if start < text.len() {
        chunks.push(text[start..].to_string());
    }

    chunks
}

/// Split `text` semantically with a token budget of `max_tokens` per chunk.
///
/// Returns an empty vector when the input is all whitespace.
pub fn chunk_by_tokens(text: &str, max_tokens: usize, tokenizer: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let counter = build_token_counter(tokenizer);
    chunk_text_with_counter(text, max_tokens.max(1), counter)
}

/// Count whitespace-delimited words.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

fn chunk_text_with_counter(text: &str, chunk_size: usize, token_counter: TokenCounter) -> Vec<String> {
    let chunker = Chunker::new(
        chunk_size,
        Box::new(move |segment: &str| token_counter.as_ref()(segment)),
    );
    chunker
        .chunk(text)
        .into_iter()
        .filter(|chunk| !chunk.trim().is_empty())
        .collect()
}

/// Build a token counter for the named tiktoken model or encoding.
///
/// Unknown names fall back to a whitespace counter so segmentation never fails.
fn build_token_counter(tokenizer: &str) -> TokenCounter {
    match build_tiktoken_counter(tokenizer) {
        Ok(counter) => counter,
        Err(error) => {
            tracing::warn!(
                tokenizer,
                error = %error,
                "Tokenizer unavailable; falling back to whitespace counter"
            );
            whitespace_token_counter()
        }
    }
}

fn build_tiktoken_counter(tokenizer: &str) -> Result<TokenCounter, TokenizerError> {
    let normalized = tokenizer.trim();
    let target = if normalized.is_empty() {
        "cl100k_base"
    } else {
        normalized
    };
    let encoding = Arc::new(resolve_encoding(target)?);

    Ok(Arc::new(move |segment: &str| {
        encoding.encode_ordinary(segment).len()
    }))
}

fn resolve_encoding(name: &str) -> Result<CoreBPE, TokenizerError> {
    if let Some(candidate) = encoding_from_name(name) {
        return candidate;
    }
    match get_bpe_from_model(name) {
        Ok(encoding) => Ok(encoding),
        Err(model_err) => {
            tracing::debug!(
                tokenizer = name,
                error = %model_err,
                "Tokenizer model lookup failed"
            );
            Err(model_err)
        }
    }
}

fn encoding_from_name(name: &str) -> Option<Result<CoreBPE, TokenizerError>> {
    match name {
        "cl100k_base" => Some(cl100k_base()),
        "o200k_base" => Some(o200k_base()),
        "p50k_base" => Some(p50k_base()),
        "p50k_edit" => Some(p50k_edit()),
        "r50k_base" | "gpt2" => Some(r50k_base()),
        _ => None,
    }
}

fn whitespace_token_counter() -> TokenCounter {
    Arc::new(|segment: &str| {
        let tokens = segment.split_whitespace().count();
        if tokens == 0 && !segment.is_empty() {
            1
        } else {
            tokens
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_chunks_emit_trailing_partial() {
        assert_eq!(chunk_by_words("a b c d e", 3), vec!["a b c", "d e"]);
    }

    #[test]
    fn word_chunks_normalize_inner_whitespace() {
        let chunks = chunk_by_words("  alpha\n\tbeta   gamma ", 2);
        assert_eq!(chunks, vec!["alpha beta", "gamma"]);
    }

    #[test]
    fn character_windows_split_mid_word() {
        assert_eq!(chunk_by_characters("abcdefgh", 5), vec!["abcde", "fgh"]);
    }

    #[test]
    fn character_windows_respect_multibyte_boundaries() {
        let text = "héllo wörld";
        let chunks = chunk_by_characters(text, 4);
        assert_eq!(chunks, vec!["héll", "o wö", "rld"]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_by_words("", 3).is_empty());
        assert!(chunk_by_words("   \n ", 3).is_empty());
        assert!(chunk_by_characters("", 5).is_empty());
        assert!(chunk_by_tokens("", 5, "cl100k_base").is_empty());
    }

    #[test]
    fn zero_thresholds_degrade_to_one() {
        assert_eq!(chunk_by_words("a b", 0), vec!["a", "b"]);
        assert_eq!(chunk_by_characters("ab", 0), vec!["a", "b"]);
    }

    #[test]
    fn whitespace_counter_chunks_respect_budget() {
        let chunks =
            chunk_text_with_counter("one two three four five", 2, whitespace_token_counter());
        assert_eq!(chunks, vec!["one two", "three four", "five"]);
    }

    #[test]
    fn token_chunks_use_tiktoken_budget() {
        let text = "The quick brown fox jumps over the lazy dog.";
        let chunks = chunk_by_tokens(text, 5, "cl100k_base");
        let counter = build_tiktoken_counter("cl100k_base").expect("encoding");
        for chunk in &chunks {
            assert!(counter.as_ref()(chunk) <= 5);
        }
        let words: Vec<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
        assert_eq!(words, text.split_whitespace().collect::<Vec<_>>());
    }

    #[test]
    fn unknown_tokenizer_falls_back_to_whitespace() {
        let chunks = chunk_by_tokens("one two three", 2, "definitely-not-a-model");
        assert_eq!(chunks, vec!["one two", "three"]);
    }

    #[test]
    fn strategy_dispatches_by_unit() {
        let strategy = ChunkingStrategy::from_unit(ChunkingUnit::Words, 3, "cl100k_base");
        assert_eq!(strategy.unit(), ChunkingUnit::Words);
        assert_eq!(strategy.size(), 3);
        assert_eq!(strategy.segment("a b c d e"), vec!["a b c", "d e"]);

        let strategy = ChunkingStrategy::from_unit(ChunkingUnit::Characters, 5, "cl100k_base");
        assert_eq!(strategy.segment("abcdefgh"), vec!["abcde", "fgh"]);
    }
}
