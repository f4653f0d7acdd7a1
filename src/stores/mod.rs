//! Persistent storage for document embeddings.
//!
//! A unified [`Backend`] trait abstracts the vector store so pipeline code
//! is not tied to one database. The shipped implementation is
//! [`sqlite::SqliteArticleStore`], SQLite with similarity search via
//! `sqlite-vec`.

pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fetcher::Document;
use crate::types::IndexError;

pub use sqlite::SqliteArticleStore;

/// A stored document with its metadata, keyed by locator.
///
/// The id uniquely identifies a record: upserting an existing id overwrites
/// the previous row and its vector rather than duplicating it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub title: String,
    pub url: String,
    pub published: Option<DateTime<Utc>>,
    pub source: Option<String>,
    /// Full document text, retained so query hits are self-contained.
    pub content: String,
}

impl IndexRecord {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            url: id.clone(),
            id,
            title: String::new(),
            published: None,
            source: None,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_published(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl From<Document> for IndexRecord {
    fn from(doc: Document) -> Self {
        IndexRecord {
            id: doc.id,
            title: doc.title,
            url: doc.url,
            published: doc.published,
            source: doc.source,
            content: doc.text,
        }
    }
}

/// Unified interface over vector store backends.
///
/// Vectors are expected to be unit-normalized, so the cosine ranking the
/// backend performs coincides with dot-product ranking.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Writes record/vector pairs, overwriting any record with the same id.
    ///
    /// Pairing the record with its vector in one tuple makes the
    /// equal-length contract structural. An empty batch is a no-op.
    async fn upsert(&self, records: Vec<(IndexRecord, Vec<f32>)>) -> Result<(), IndexError>;

    /// Fetches a single record by id.
    async fn get_by_id(&self, id: &str) -> Result<Option<IndexRecord>, IndexError>;

    /// Returns up to `top_k` records ranked by cosine similarity to
    /// `query_embedding`, most similar first.
    async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<(IndexRecord, f32)>, IndexError>;

    /// Total number of stored records.
    async fn count(&self) -> Result<usize, IndexError>;
}
