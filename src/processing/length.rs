//! Summary-length planning for individual chunks.
//!
//! The requested maximum is proportional to the chunk's word count and capped by the model's
//! practical output ceiling. The minimum is the configured floor, pulled below the maximum when
//! the chunk is small. Chunks whose maximum computes to zero cannot be given a valid range and
//! are passed through verbatim instead of being sent to the summarizer.

use super::chunking::count_words;
use super::types::SummarizeError;
use serde::Serialize;

/// Parameters controlling how summary lengths scale with chunk size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LengthPolicy {
    /// Fraction of the chunk's word count requested as the maximum length, in `(0, 1]`.
    pub proportion: f64,
    /// Ceiling for the maximum length.
    pub max_cap: usize,
    /// Preferred minimum length.
    pub min_cap: usize,
}

/// `(max_length, min_length)` pair requested from the summarizer for one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LengthBounds {
    /// Upper bound on the generated summary length.
    pub max_length: usize,
    /// Lower bound on the generated summary length.
    pub min_length: usize,
}

impl LengthPolicy {
    /// Default proportion of input words requested as summary length.
    pub const DEFAULT_PROPORTION: f64 = 0.3;
    /// Default ceiling for the requested maximum.
    pub const DEFAULT_MAX_CAP: usize = 200;
    /// Default floor for the requested minimum.
    pub const DEFAULT_MIN_CAP: usize = 20;

    /// Compute bounds for a chunk of text.
    pub fn bounds_for(&self, chunk: &str) -> LengthBounds {
        self.bounds_for_word_count(count_words(chunk))
    }

    /// Compute bounds for a chunk containing `word_count` words.
    pub fn bounds_for_word_count(&self, word_count: usize) -> LengthBounds {
        let proportional = (word_count as f64 * self.proportion).floor();
        let max_length = if proportional.is_finite() && proportional > 0.0 {
            (proportional as usize).min(self.max_cap)
        } else {
            0
        };
        let min_length = self.min_cap.min(max_length.saturating_sub(1));
        LengthBounds {
            max_length,
            min_length,
        }
    }
}

impl Default for LengthPolicy {
    fn default() -> Self {
        Self {
            proportion: Self::DEFAULT_PROPORTION,
            max_cap: Self::DEFAULT_MAX_CAP,
            min_cap: Self::DEFAULT_MIN_CAP,
        }
    }
}

impl LengthBounds {
    /// Whether a valid `min < max` range exists, i.e. the chunk should be summarized.
    pub fn is_summarizable(&self) -> bool {
        self.max_length > 0
    }

    /// Reject bounds that violate `min_length < max_length` before they reach a provider.
    pub fn ensure_valid(&self, chunk_index: usize) -> Result<(), SummarizeError> {
        if self.min_length >= self.max_length {
            return Err(SummarizeError::InvalidLengthBounds {
                chunk_index,
                max_length: self.max_length,
                min_length: self.min_length,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hundred_words_yield_thirty_and_twenty() {
        let policy = LengthPolicy::default();
        let text = "word ".repeat(100);
        assert_eq!(
            policy.bounds_for(&text),
            LengthBounds {
                max_length: 30,
                min_length: 20
            }
        );
    }

    #[test]
    fn max_is_capped() {
        let policy = LengthPolicy::default();
        let bounds = policy.bounds_for_word_count(2500);
        assert_eq!(bounds.max_length, 200);
        assert_eq!(bounds.min_length, 20);

        let wide = LengthPolicy {
            max_cap: 2000,
            ..LengthPolicy::default()
        };
        assert_eq!(wide.bounds_for_word_count(2500).max_length, 750);
    }

    #[test]
    fn min_drops_below_max_for_small_chunks() {
        let bounds = LengthPolicy::default().bounds_for_word_count(40);
        assert_eq!(bounds.max_length, 12);
        assert_eq!(bounds.min_length, 11);
        assert!(bounds.ensure_valid(0).is_ok());
    }

    #[test]
    fn tiny_chunks_floor_min_at_zero() {
        let policy = LengthPolicy::default();
        let one = policy.bounds_for_word_count(4);
        assert_eq!(one.max_length, 1);
        assert_eq!(one.min_length, 0);
        assert!(one.is_summarizable());

        let none = policy.bounds_for_word_count(2);
        assert_eq!(none.max_length, 0);
        assert_eq!(none.min_length, 0);
        assert!(!none.is_summarizable());
    }

    #[test]
    fn ensure_valid_flags_inverted_bounds() {
        let bounds = LengthBounds {
            max_length: 5,
            min_length: 5,
        };
        let error = bounds.ensure_valid(3).unwrap_err();
        assert!(matches!(
            error,
            SummarizeError::InvalidLengthBounds {
                chunk_index: 3,
                max_length: 5,
                min_length: 5
            }
        ));
    }

    #[test]
    fn summarizable_bounds_are_always_consistent() {
        let policy = LengthPolicy::default();
        for words in 0..5000 {
            let bounds = policy.bounds_for_word_count(words);
            if bounds.is_summarizable() {
                assert!(bounds.min_length < bounds.max_length);
                assert!(bounds.max_length <= policy.max_cap);
            }
        }
    }
}
