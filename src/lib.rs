//! ```text
//! Feed URLs ──► collector::collect_locators ──► unique locators (first-N-seen)
//!                                                    │
//!                          fetcher::fetch_all ◄──────┘
//!                                │
//!                                ├─► Document (text + metadata)  per item
//!                                └─► FetchError                  per item
//!
//! Documents ──► embedding::Embedder ──► unit vectors
//!                    │   (tokenize ► encode ► masked mean pool ► L2 norm)
//!                    └── Encoder seam: JinaBertEncoder | MockEncoder
//!
//! (IndexRecord, vector) ──► stores::Backend::upsert ──► SQLite + sqlite-vec
//!
//! Query text ──► Embedder::embed_query ──► Backend::search_similar ──► top-k hits
//! ```

pub mod collector;
pub mod embedding;
pub mod fetcher;
pub mod pipeline;
pub mod stores;
pub mod types;

pub use embedding::{Embedder, Encoder, JinaBertEncoder, MockEncoder};
pub use fetcher::Document;
pub use pipeline::{Pipeline, RunSummary};
pub use stores::{Backend, IndexRecord, SqliteArticleStore};
pub use types::{FetchError, IndexError, PipelineConfig};
