use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

use crate::processing::{ChunkingStrategy, LengthPolicy};

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the summarization service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Backend used to realize the summarizer capability.
    pub summarization_provider: SummarizationProvider,
    /// Closed set of model selectors mapped to provider model identifiers, in declaration order.
    pub summarization_models: Vec<ModelEntry>,
    /// Selector used when a request does not name one.
    pub summarization_default_model: String,
    /// Base URL of the hosted inference API.
    pub huggingface_url: Option<String>,
    /// Bearer token for the hosted inference API.
    pub huggingface_api_token: Option<String>,
    /// Base URL of the Ollama runtime.
    pub ollama_url: Option<String>,
    /// Unit the segmenter measures chunks in.
    pub chunking_unit: ChunkingUnit,
    /// Chunk-size threshold expressed in `chunking_unit`.
    pub chunk_size: usize,
    /// Tokenizer name used by the token chunking policy.
    pub chunk_tokenizer: String,
    /// Fraction of a chunk's word count requested as the maximum summary length.
    pub summary_proportion: f64,
    /// Upper bound on the requested maximum summary length.
    pub summary_max_cap: usize,
    /// Preferred minimum summary length.
    pub summary_min_cap: usize,
    /// Number of chunks summarized concurrently (1 keeps processing sequential).
    pub summary_concurrency: usize,
    /// Per-request deadline in seconds; zero disables the deadline.
    pub summary_timeout_secs: u64,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Upper bound on accepted upload bodies.
    pub max_upload_bytes: usize,
}

/// A single `selector=model` pair from `SUMMARIZATION_MODELS`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelEntry {
    /// Name callers use to pick this model.
    pub selector: String,
    /// Identifier understood by the provider.
    pub model: String,
}

/// Supported summarization backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarizationProvider {
    /// Hosted inference pipeline (`summarization` task).
    HuggingFace,
    /// Local Ollama runtime.
    Ollama,
}

/// Unit in which the segmenter bounds chunk size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingUnit {
    /// Whitespace-delimited words.
    Words,
    /// Unicode scalar values.
    Characters,
    /// BPE tokens counted with tiktoken.
    Tokens,
}

impl ChunkingUnit {
    /// Default chunk-size threshold for this unit.
    pub const fn default_chunk_size(self) -> usize {
        match self {
            Self::Words => 2500,
            Self::Characters => 1024,
            Self::Tokens => 512,
        }
    }

    /// Lowercase label used in logs and API responses.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Words => "words",
            Self::Characters => "characters",
            Self::Tokens => "tokens",
        }
    }
}

const DEFAULT_MODELS: &str = "default=sshleifer/distilbart-cnn-12-6";
const DEFAULT_SELECTOR: &str = "default";
const DEFAULT_TOKENIZER: &str = "cl100k_base";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let chunking_unit = match load_env_optional("CHUNKING_UNIT") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("CHUNKING_UNIT".into()))?,
            None => ChunkingUnit::Characters,
        };

        let config = Self {
            summarization_provider: match load_env_optional("SUMMARIZATION_PROVIDER") {
                Some(value) => value
                    .parse()
                    .map_err(|()| ConfigError::InvalidValue("SUMMARIZATION_PROVIDER".into()))?,
                None => SummarizationProvider::HuggingFace,
            },
            summarization_models: parse_model_entries(
                &load_env_optional("SUMMARIZATION_MODELS")
                    .unwrap_or_else(|| DEFAULT_MODELS.to_string()),
            )
            .ok_or_else(|| ConfigError::InvalidValue("SUMMARIZATION_MODELS".into()))?,
            summarization_default_model: load_env_optional("SUMMARIZATION_DEFAULT_MODEL")
                .unwrap_or_else(|| DEFAULT_SELECTOR.to_string()),
            huggingface_url: load_env_optional("HUGGINGFACE_URL"),
            huggingface_api_token: load_env_optional("HUGGINGFACE_API_TOKEN"),
            ollama_url: load_env_optional("OLLAMA_URL"),
            chunking_unit,
            chunk_size: load_parsed("CHUNK_SIZE")?
                .unwrap_or_else(|| chunking_unit.default_chunk_size()),
            chunk_tokenizer: load_env_optional("CHUNK_TOKENIZER")
                .unwrap_or_else(|| DEFAULT_TOKENIZER.to_string()),
            summary_proportion: load_parsed("SUMMARY_PROPORTION")?
                .unwrap_or(LengthPolicy::DEFAULT_PROPORTION),
            summary_max_cap: load_parsed("SUMMARY_MAX_CAP")?
                .unwrap_or(LengthPolicy::DEFAULT_MAX_CAP),
            summary_min_cap: load_parsed("SUMMARY_MIN_CAP")?
                .unwrap_or(LengthPolicy::DEFAULT_MIN_CAP),
            summary_concurrency: load_parsed("SUMMARY_CONCURRENCY")?.unwrap_or(1),
            summary_timeout_secs: load_parsed("SUMMARY_TIMEOUT_SECS")?.unwrap_or(300),
            server_port: load_parsed("SERVER_PORT")?,
            max_upload_bytes: load_parsed("MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that single-variable parsing cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue("CHUNK_SIZE".into()));
        }
        if !(self.summary_proportion > 0.0 && self.summary_proportion <= 1.0) {
            return Err(ConfigError::InvalidValue("SUMMARY_PROPORTION".into()));
        }
        if self.summary_max_cap == 0 {
            return Err(ConfigError::InvalidValue("SUMMARY_MAX_CAP".into()));
        }
        if self.summary_concurrency == 0 {
            return Err(ConfigError::InvalidValue("SUMMARY_CONCURRENCY".into()));
        }
        if !self
            .summarization_models
            .iter()
            .any(|entry| entry.selector == self.summarization_default_model)
        {
            return Err(ConfigError::InvalidValue(
                "SUMMARIZATION_DEFAULT_MODEL".into(),
            ));
        }
        Ok(())
    }

    /// Apply command-line chunking overrides and re-validate.
    ///
    /// Switching the unit without an explicit size resets the size to that unit's default, so a
    /// character window is never reused as a word or token budget.
    pub fn override_chunking(
        &mut self,
        unit: Option<ChunkingUnit>,
        chunk_size: Option<usize>,
    ) -> Result<(), ConfigError> {
        if let Some(unit) = unit {
            self.chunking_unit = unit;
            self.chunk_size = unit.default_chunk_size();
        }
        if let Some(size) = chunk_size {
            self.chunk_size = size;
        }
        self.validate()
    }

    /// Segmenter policy derived from the chunking settings.
    pub fn chunking_strategy(&self) -> ChunkingStrategy {
        ChunkingStrategy::from_unit(self.chunking_unit, self.chunk_size, &self.chunk_tokenizer)
    }

    /// Length Adapter policy derived from the summary-length settings.
    pub fn length_policy(&self) -> LengthPolicy {
        LengthPolicy {
            proportion: self.summary_proportion,
            max_cap: self.summary_max_cap,
            min_cap: self.summary_min_cap,
        }
    }

    /// Request deadline, or `None` when disabled.
    pub fn summary_timeout(&self) -> Option<Duration> {
        (self.summary_timeout_secs > 0).then(|| Duration::from_secs(self.summary_timeout_secs))
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Parse a comma separated list of `selector=model` pairs.
///
/// A bare entry without `=` uses the same string as selector and model. Returns `None` for an
/// empty list, an empty side of a pair, or a duplicated selector.
pub fn parse_model_entries(raw: &str) -> Option<Vec<ModelEntry>> {
    let mut entries: Vec<ModelEntry> = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        let (selector, model) = match item.split_once('=') {
            Some((selector, model)) => (selector.trim(), model.trim()),
            None => (item, item),
        };
        if selector.is_empty() || model.is_empty() {
            return None;
        }
        if entries.iter().any(|entry| entry.selector == selector) {
            return None;
        }
        entries.push(ModelEntry {
            selector: selector.to_string(),
            model: model.to_string(),
        });
    }
    (!entries.is_empty()).then_some(entries)
}

impl std::str::FromStr for SummarizationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for ChunkingUnit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "words" | "word" => Ok(Self::Words),
            "characters" | "chars" | "character" => Ok(Self::Characters),
            "tokens" | "token" => Ok(Self::Tokens),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        provider = ?config.summarization_provider,
        models = config.summarization_models.len(),
        default_model = %config.summarization_default_model,
        chunking_unit = config.chunking_unit.label(),
        chunk_size = config.chunk_size,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

/// Configuration fixture shared by unit tests across modules.
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        summarization_provider: SummarizationProvider::HuggingFace,
        summarization_models: parse_model_entries(DEFAULT_MODELS).expect("models"),
        summarization_default_model: DEFAULT_SELECTOR.into(),
        huggingface_url: None,
        huggingface_api_token: None,
        ollama_url: None,
        chunking_unit: ChunkingUnit::Characters,
        chunk_size: 1024,
        chunk_tokenizer: DEFAULT_TOKENIZER.into(),
        summary_proportion: 0.3,
        summary_max_cap: 200,
        summary_min_cap: 20,
        summary_concurrency: 1,
        summary_timeout_secs: 300,
        server_port: None,
        max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_selector_model_pairs() {
        let entries = parse_model_entries("default=bart, t5 = t5-small ,pegasus").expect("entries");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].selector, "t5");
        assert_eq!(entries[1].model, "t5-small");
        assert_eq!(entries[2].selector, "pegasus");
        assert_eq!(entries[2].model, "pegasus");
    }

    #[test]
    fn rejects_duplicate_or_empty_entries() {
        assert!(parse_model_entries("").is_none());
        assert!(parse_model_entries("a=x,a=y").is_none());
        assert!(parse_model_entries("=x").is_none());
    }

    #[test]
    fn chunking_unit_parses_aliases() {
        assert_eq!("chars".parse::<ChunkingUnit>(), Ok(ChunkingUnit::Characters));
        assert_eq!("Words".parse::<ChunkingUnit>(), Ok(ChunkingUnit::Words));
        assert!("lines".parse::<ChunkingUnit>().is_err());
    }

    #[test]
    fn validate_rejects_default_outside_model_set() {
        let mut config = test_config();
        config.summarization_default_model = "missing".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(key)) if key == "SUMMARIZATION_DEFAULT_MODEL"
        ));
    }

    #[test]
    fn validate_rejects_out_of_range_proportion() {
        let mut config = test_config();
        config.summary_proportion = 1.5;
        assert!(config.validate().is_err());
        config.summary_proportion = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unit_override_resets_size_to_unit_default() {
        let mut config = test_config();
        config
            .override_chunking(Some(ChunkingUnit::Words), None)
            .expect("valid override");
        assert_eq!(config.chunking_unit, ChunkingUnit::Words);
        assert_eq!(config.chunk_size, 2500);
    }

    #[test]
    fn explicit_size_wins_over_unit_default() {
        let mut config = test_config();
        config
            .override_chunking(Some(ChunkingUnit::Tokens), Some(64))
            .expect("valid override");
        assert_eq!(config.chunking_unit, ChunkingUnit::Tokens);
        assert_eq!(config.chunk_size, 64);

        config
            .override_chunking(None, Some(300))
            .expect("size-only override");
        assert_eq!(config.chunking_unit, ChunkingUnit::Tokens);
        assert_eq!(config.chunk_size, 300);
    }

    #[test]
    fn zero_size_override_is_rejected() {
        let mut config = test_config();
        assert!(matches!(
            config.override_chunking(None, Some(0)),
            Err(ConfigError::InvalidValue(key)) if key == "CHUNK_SIZE"
        ));
    }

    #[test]
    fn timeout_zero_disables_deadline() {
        let mut config = test_config();
        config.summary_timeout_secs = 0;
        assert!(config.summary_timeout().is_none());
    }
}
