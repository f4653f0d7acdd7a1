//! Ingests news feeds into a local vector index, then runs a sample query.
//!
//! ```bash
//! cargo run --example news_pipeline
//! ```
//!
//! Environment overrides:
//! - `FEEDSMITH_FEEDS`   comma-separated feed URLs
//! - `FEEDSMITH_DB`      SQLite database path (default `./news_index.sqlite`)
//! - `FEEDSMITH_TARGET`  locator cap (default 50)
//! - `FEEDSMITH_QUERY`   sample query text
//! - `FEEDSMITH_MOCK=1`  use the deterministic mock encoder (no model download)

use std::env;
use std::time::Instant;

use tracing_subscriber::FmtSubscriber;

use feedsmith::types::{DEFAULT_EMBED_MODEL, DEFAULT_MAX_TOKENS, DEFAULT_TOP_K};
use feedsmith::{
    Encoder, IndexError, JinaBertEncoder, MockEncoder, Pipeline, PipelineConfig,
    SqliteArticleStore,
};

const DEFAULT_FEEDS: &[&str] = &[
    "http://feeds.bbci.co.uk/news/rss.xml",
    "https://www.theguardian.com/world/rss",
    "https://rss.nytimes.com/services/xml/rss/nyt/HomePage.xml",
];

#[tokio::main]
async fn main() -> Result<(), IndexError> {
    init_tracing();

    let feeds: Vec<String> = env::var("FEEDSMITH_FEEDS")
        .map(|raw| raw.split(',').map(str::to_owned).collect())
        .unwrap_or_else(|_| DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect());

    let db_path = env::var("FEEDSMITH_DB").unwrap_or_else(|_| "./news_index.sqlite".to_string());

    let target = env::var("FEEDSMITH_TARGET")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(feedsmith::types::DEFAULT_TARGET_COUNT);

    let query = env::var("FEEDSMITH_QUERY").unwrap_or_else(|_| "climate change summit".to_string());

    let config = PipelineConfig::new(feeds).with_target_count(target);
    let store = SqliteArticleStore::open(&db_path).await?;

    let use_mock = env::var("FEEDSMITH_MOCK").map(|v| v == "1").unwrap_or(false);
    if use_mock {
        run(config, MockEncoder::new(), store, &db_path, &query).await
    } else {
        let encoder = JinaBertEncoder::load(DEFAULT_EMBED_MODEL, DEFAULT_MAX_TOKENS)?;
        run(config, encoder, store, &db_path, &query).await
    }
}

async fn run<E: Encoder>(
    config: PipelineConfig,
    encoder: E,
    store: SqliteArticleStore,
    db_path: &str,
    query: &str,
) -> Result<(), IndexError> {
    let pipeline = Pipeline::new(config, encoder, store)?;

    let start = Instant::now();
    let summary = pipeline.run().await?;

    println!("\nIngestion complete in {:.1?}", start.elapsed());
    println!("  locators collected : {}", summary.collected);
    println!("  documents fetched  : {}", summary.fetched);
    println!("  documents skipped  : {}", summary.skipped);
    println!("  records ingested   : {}", summary.ingested);
    println!("  sqlite database    : {db_path}");

    let hits = pipeline.query(query, DEFAULT_TOP_K).await?;
    println!("\nQuery: {query:?}");
    for (record, score) in hits {
        let preview: String = record.content.chars().take(80).collect();
        println!("  {score:.3}  {}  {preview}…", record.title);
    }

    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
