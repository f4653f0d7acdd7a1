//! Shared error types, configuration, and pipeline-wide defaults.

use thiserror::Error;

/// Default number of unique locators a collection run aims for.
pub const DEFAULT_TARGET_COUNT: usize = 50;

/// Minimum trimmed character count for a fetched document to be kept.
pub const DEFAULT_MIN_TEXT_LEN: usize = 200;

/// Number of texts embedded per encoder forward pass.
pub const DEFAULT_BATCH_SIZE: usize = 8;

/// Token budget per document; longer inputs are truncated by the tokenizer.
pub const DEFAULT_MAX_TOKENS: usize = 8192;

/// Default result count for similarity queries.
pub const DEFAULT_TOP_K: usize = 3;

/// Hugging Face model id for the default encoder.
pub const DEFAULT_EMBED_MODEL: &str = "jinaai/jina-embeddings-v2-base-en";

/// Fatal errors that abort the current operation.
///
/// Per-item fetch failures are represented separately as
/// [`FetchError`] values and never surface through this enum.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Encoder or tokenizer unavailable, or inference failed.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The persistent store could not be opened, written, or queried.
    #[error("storage error: {0}")]
    Storage(String),

    /// A document or feed payload could not be interpreted.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Rejected configuration, e.g. a zero target count.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Per-item failure while resolving a locator into a [`crate::fetcher::Document`].
///
/// These are values collected at the item boundary; the surrounding batch
/// always continues.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure or non-success HTTP status.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The page markup could not be processed.
    #[error("extraction failed: {0}")]
    Extract(String),

    /// Neither the main article body nor the page fallback produced text.
    #[error("no extractable content")]
    NoContent,

    /// Extracted text fell below the minimum length threshold.
    #[error("text too short ({len} chars)")]
    TooShort { len: usize },
}

/// Static parameters for an ingestion run.
///
/// The store path is deliberately not part of this struct: it is a
/// constructor argument of the store adapter so tests can point each run at
/// an isolated temporary database.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Feed URLs polled in order during collection.
    pub feeds: Vec<String>,
    /// Cap on unique locators gathered per run. Must be > 0.
    pub target_count: usize,
    /// Minimum trimmed character count for a document to be kept.
    pub min_text_len: usize,
    /// Number of texts per embedding batch.
    pub batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            target_count: DEFAULT_TARGET_COUNT,
            min_text_len: DEFAULT_MIN_TEXT_LEN,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl PipelineConfig {
    /// Configuration for the given feed list, with defaults everywhere else.
    pub fn new(feeds: Vec<String>) -> Self {
        Self {
            feeds,
            ..Default::default()
        }
    }

    /// Override the locator cap.
    #[must_use]
    pub fn with_target_count(mut self, target_count: usize) -> Self {
        self.target_count = target_count;
        self
    }

    /// Override the minimum document length.
    #[must_use]
    pub fn with_min_text_len(mut self, min_text_len: usize) -> Self {
        self.min_text_len = min_text_len;
        self
    }

    /// Override the embedding batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Rejects degenerate parameter combinations before a run starts.
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.target_count == 0 {
            return Err(IndexError::Config("target_count must be > 0".into()));
        }
        if self.batch_size == 0 {
            return Err(IndexError::Config("batch_size must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_target_count_is_rejected() {
        let config = PipelineConfig::default().with_target_count(0);
        assert!(matches!(config.validate(), Err(IndexError::Config(_))));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = PipelineConfig::default().with_batch_size(0);
        assert!(matches!(config.validate(), Err(IndexError::Config(_))));
    }
}
