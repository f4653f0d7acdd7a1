//! End-to-end orchestration: collect, fetch, embed, upsert, query.

use reqwest::Client;
use tracing::{info, warn};

use crate::collector::collect_locators;
use crate::embedding::{Embedder, Encoder};
use crate::fetcher::fetch_all;
use crate::stores::{Backend, IndexRecord};
use crate::types::{IndexError, PipelineConfig};

const USER_AGENT: &str = concat!("feedsmith/", env!("CARGO_PKG_VERSION"));

/// Counters reported at the end of an ingestion run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Unique locators gathered from the feeds.
    pub collected: usize,
    /// Documents that fetched and extracted successfully.
    pub fetched: usize,
    /// Locators dropped by per-item fetch or extraction failures.
    pub skipped: usize,
    /// Records written to the store.
    pub ingested: usize,
}

/// A configured ingestion pipeline over one encoder and one store.
///
/// Stages run sequentially on the calling task; ingestion order follows
/// collector order throughout. Per-item failures are logged and skipped;
/// encoder and store failures abort the run.
pub struct Pipeline<E, B> {
    config: PipelineConfig,
    client: Client,
    embedder: Embedder<E>,
    store: B,
}

impl<E: Encoder, B: Backend> Pipeline<E, B> {
    pub fn new(config: PipelineConfig, encoder: E, store: B) -> Result<Self, IndexError> {
        config.validate()?;
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .use_rustls_tls()
            .build()?;
        let embedder = Embedder::new(encoder).with_batch_size(config.batch_size);
        Ok(Self {
            config,
            client,
            embedder,
            store,
        })
    }

    /// Collects, fetches, embeds, and upserts one batch of documents.
    pub async fn run(&self) -> Result<RunSummary, IndexError> {
        let locators =
            collect_locators(&self.client, &self.config.feeds, self.config.target_count).await;
        info!(collected = locators.len(), "collected locators");

        let outcomes = fetch_all(&self.client, &locators, self.config.min_text_len).await;
        let mut documents = Vec::new();
        let mut skipped = 0usize;
        for (url, outcome) in locators.iter().zip(outcomes) {
            match outcome {
                Ok(document) => documents.push(document),
                Err(err) => {
                    skipped += 1;
                    warn!(url = %url, error = %err, "skipping document");
                }
            }
        }
        info!(fetched = documents.len(), skipped, "fetched documents");

        let texts: Vec<String> = documents.iter().map(|doc| doc.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts)?;

        let records: Vec<(IndexRecord, Vec<f32>)> = documents
            .into_iter()
            .zip(vectors)
            .map(|(doc, vector)| (IndexRecord::from(doc), vector))
            .collect();
        let ingested = records.len();
        self.store.upsert(records).await?;

        let summary = RunSummary {
            collected: locators.len(),
            fetched: ingested,
            skipped,
            ingested,
        };
        info!(
            collected = summary.collected,
            fetched = summary.fetched,
            skipped = summary.skipped,
            ingested = summary.ingested,
            "ingestion run complete"
        );
        Ok(summary)
    }

    /// Embeds `text` and returns the `top_k` most similar stored records,
    /// most similar first.
    pub async fn query(
        &self,
        text: &str,
        top_k: usize,
    ) -> Result<Vec<(IndexRecord, f32)>, IndexError> {
        let query_embedding = self.embedder.embed_query(text)?;
        self.store.search_similar(&query_embedding, top_k).await
    }

    /// The store this pipeline writes to.
    pub fn store(&self) -> &B {
        &self.store
    }
}
