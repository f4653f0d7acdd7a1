//! Queries an existing news index built by the `news_pipeline` demo.
//!
//! ```bash
//! cargo run --example query_index -- "your query text"
//! ```
//!
//! Set `FEEDSMITH_MOCK=1` to embed the query with the mock encoder (only
//! useful against an index that was also built with it).

use std::env;

use feedsmith::types::{DEFAULT_EMBED_MODEL, DEFAULT_MAX_TOKENS, DEFAULT_TOP_K};
use feedsmith::{
    Backend, Embedder, Encoder, IndexError, JinaBertEncoder, MockEncoder, SqliteArticleStore,
};

#[tokio::main]
async fn main() -> Result<(), IndexError> {
    let query = env::args()
        .nth(1)
        .unwrap_or_else(|| "climate change summit".to_string());
    let db_path = env::var("FEEDSMITH_DB").unwrap_or_else(|_| "./news_index.sqlite".to_string());

    let store = SqliteArticleStore::open(&db_path).await?;
    let stored = store.count().await?;
    if stored == 0 {
        println!("index at {db_path} is empty — run the news_pipeline demo first");
        return Ok(());
    }
    println!("{stored} records in {db_path}");

    let use_mock = env::var("FEEDSMITH_MOCK").map(|v| v == "1").unwrap_or(false);
    let hits = if use_mock {
        search(&store, MockEncoder::new(), &query).await?
    } else {
        let encoder = JinaBertEncoder::load(DEFAULT_EMBED_MODEL, DEFAULT_MAX_TOKENS)?;
        search(&store, encoder, &query).await?
    };

    println!("\nTop {} for {query:?}:", hits.len());
    for (rank, (record, score)) in hits.iter().enumerate() {
        println!("{}. [{score:.3}] {}", rank + 1, record.title);
        println!("   {}", record.url);
        if let Some(published) = record.published {
            println!("   published {published}");
        }
        let preview: String = record.content.chars().take(120).collect();
        println!("   {preview}…");
    }

    Ok(())
}

async fn search<E: Encoder>(
    store: &SqliteArticleStore,
    encoder: E,
    query: &str,
) -> Result<Vec<(feedsmith::IndexRecord, f32)>, IndexError> {
    let embedder = Embedder::new(encoder);
    let query_embedding = embedder.embed_query(query)?;
    store.search_similar(&query_embedding, DEFAULT_TOP_K).await
}
