//! SQLite vector store backed by the `sqlite-vec` extension.

use std::os::raw::c_char;
use std::path::Path;
use std::sync::Once;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_rusqlite::{Connection, OptionalExtension, ffi};

use crate::types::IndexError;

use super::{Backend, IndexRecord};

/// Persistent article store: one metadata row plus one embedding row per id.
///
/// The database path is a constructor argument; each store instance owns one
/// file. The schema is created on first open, so opening is idempotent.
/// Concurrent writer processes on the same path are not supported — this
/// design assumes at most one writer at a time.
#[derive(Clone)]
pub struct SqliteArticleStore {
    conn: Connection,
}

impl SqliteArticleStore {
    /// Opens (creating if absent) the store at `path` and verifies that the
    /// `sqlite-vec` extension is functional.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        Self::register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| IndexError::Storage(err.to_string()))?;

        conn.call(|conn| -> std::result::Result<(), tokio_rusqlite::rusqlite::Error> {
            conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0))?;
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS articles (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL DEFAULT '',
                    url TEXT NOT NULL,
                    published TEXT,
                    source TEXT,
                    content TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS articles_embeddings (
                    id TEXT PRIMARY KEY,
                    embedding BLOB NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_articles_source ON articles(source);",
            )?;
            Ok(())
        })
        .await
        .map_err(|err| IndexError::Storage(err.to_string()))?;

        Ok(Self { conn })
    }

    /// Underlying connection, for queries the [`Backend`] trait does not cover.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn register_sqlite_vec() -> Result<(), IndexError> {
        use std::sync::Mutex;

        static INIT: Once = Once::new();
        static INIT_RESULT: Mutex<Option<Result<(), String>>> = Mutex::new(None);

        INIT.call_once(|| {
            let result = unsafe {
                type SqliteExtensionInit = unsafe extern "C" fn(
                    *mut ffi::sqlite3,
                    *mut *mut c_char,
                    *const ffi::sqlite3_api_routines,
                ) -> i32;

                let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
                let init_fn: SqliteExtensionInit =
                    std::mem::transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
                let rc = ffi::sqlite3_auto_extension(Some(init_fn));
                if rc != ffi::SQLITE_OK {
                    Err(format!(
                        "failed to register sqlite-vec extension (code {rc})"
                    ))
                } else {
                    Ok(())
                }
            };
            *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
        });

        INIT_RESULT
            .lock()
            .expect("init result mutex poisoned")
            .clone()
            .expect("init was called but result not set")
            .map_err(IndexError::Storage)
    }
}

fn row_to_record(
    id: String,
    title: String,
    url: String,
    published: Option<String>,
    source: Option<String>,
    content: String,
) -> IndexRecord {
    IndexRecord {
        id,
        title,
        url,
        published: published
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        source,
        content,
    }
}

#[async_trait]
impl Backend for SqliteArticleStore {
    async fn upsert(&self, records: Vec<(IndexRecord, Vec<f32>)>) -> Result<(), IndexError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut rows = Vec::with_capacity(records.len());
        for (record, embedding) in records {
            let embedding_json = serde_json::to_string(&embedding)
                .map_err(|err| IndexError::Storage(err.to_string()))?;
            rows.push((record, embedding_json));
        }

        self.conn
            .call(move |conn| -> std::result::Result<(), tokio_rusqlite::rusqlite::Error> {
                let tx = conn.transaction()?;
                for (record, embedding_json) in rows {
                    tx.execute(
                        "INSERT INTO articles (id, title, url, published, source, content)
                         VALUES (?, ?, ?, ?, ?, ?)
                         ON CONFLICT(id) DO UPDATE SET
                             title = excluded.title,
                             url = excluded.url,
                             published = excluded.published,
                             source = excluded.source,
                             content = excluded.content",
                        (
                            &record.id,
                            &record.title,
                            &record.url,
                            &record.published.map(|dt| dt.to_rfc3339()),
                            &record.source,
                            &record.content,
                        ),
                    )?;
                    tx.execute(
                        "INSERT INTO articles_embeddings (id, embedding)
                         VALUES (?, vec_f32(?))
                         ON CONFLICT(id) DO UPDATE SET embedding = excluded.embedding",
                        (&record.id, &embedding_json),
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|err| IndexError::Storage(err.to_string()))
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<IndexRecord>, IndexError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| -> std::result::Result<Option<IndexRecord>, tokio_rusqlite::rusqlite::Error> {
                let record = conn
                    .query_row(
                        "SELECT id, title, url, published, source, content
                         FROM articles WHERE id = ?",
                        [&id],
                        |row| {
                            Ok(row_to_record(
                                row.get(0)?,
                                row.get(1)?,
                                row.get(2)?,
                                row.get(3)?,
                                row.get(4)?,
                                row.get(5)?,
                            ))
                        },
                    )
                    .optional()?;
                Ok(record)
            })
            .await
            .map_err(|err| IndexError::Storage(err.to_string()))
    }

    async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<(IndexRecord, f32)>, IndexError> {
        let embedding_json = serde_json::to_string(query_embedding)
            .map_err(|err| IndexError::Storage(err.to_string()))?;

        self.conn
            .call(move |conn| -> std::result::Result<Vec<(IndexRecord, f32)>, tokio_rusqlite::rusqlite::Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT a.id, a.title, a.url, a.published, a.source, a.content,
                            vec_distance_cosine(e.embedding, vec_f32(?)) AS distance
                     FROM articles a
                     JOIN articles_embeddings e ON a.id = e.id
                     ORDER BY distance ASC
                     LIMIT {top_k}"
                ))?;

                let rows = stmt.query_map([&embedding_json], |row| {
                    let record = row_to_record(
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    );
                    let distance: f32 = row.get(6)?;
                    Ok((record, 1.0 - distance))
                })?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(row?);
                }
                Ok(results)
            })
            .await
            .map_err(|err| IndexError::Storage(err.to_string()))
    }

    async fn count(&self) -> Result<usize, IndexError> {
        self.conn
            .call(|conn| -> std::result::Result<usize, tokio_rusqlite::rusqlite::Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| IndexError::Storage(err.to_string()))
    }
}
