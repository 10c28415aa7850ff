//! Persistent vector index.
//!
//! Stores (chunk metadata, embedding) entries in SQLite and retrieves
//! the top-k chunks for a query by cosine similarity, ties broken by
//! insertion order. Entries are immutable: a changed source file is
//! re-indexed by replacing all of its entries in one transaction
//! (delete-then-insert), so no stale chunks of a superseded file
//! remain retrievable.
//!
//! Identical chunk text from different sources is deliberately not
//! deduplicated here; change detection at the file level owns that
//! concern.

use anyhow::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::config::EmbeddingConfig;
use crate::embedding;
use crate::fingerprint::digest_hex;
use crate::models::{DocumentChunk, RetrievedChunk};

pub struct VectorIndex {
    pool: SqlitePool,
}

impl VectorIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Replace all entries for `source` with embeddings of `chunks`.
    ///
    /// Embeds first (no partial writes if the service fails), then
    /// swaps the old entries for the new ones in one transaction.
    /// Returns the number of entries written.
    pub async fn replace_source(
        &self,
        embed_config: &EmbeddingConfig,
        source: &str,
        chunks: &[DocumentChunk],
    ) -> Result<u64> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(embed_config.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            vectors.extend(embedding::embed_texts(embed_config, &texts).await?);
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        let next_position: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(position), 0) + 1 FROM entries")
                .fetch_one(&mut *tx)
                .await?;

        sqlx::query("DELETE FROM entries WHERE source = ?")
            .bind(source)
            .execute(&mut *tx)
            .await?;

        for (offset, (chunk, vector)) in chunks.iter().zip(vectors.iter()).enumerate() {
            sqlx::query(
                r#"
                INSERT INTO entries (id, source, tag, seq, text, hash, embedding, position, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&chunk.source)
            .bind(&chunk.tag)
            .bind(chunk.seq)
            .bind(&chunk.text)
            .bind(digest_hex(chunk.text.as_bytes()))
            .bind(embedding::vec_to_blob(vector))
            .bind(next_position + offset as i64)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(chunks.len() as u64)
    }

    /// Top-k chunks by cosine similarity to `query_text`.
    ///
    /// Ordering is similarity descending, then insertion position
    /// ascending, so repeated retrieval over the same index state is
    /// stable.
    pub async fn retrieve(
        &self,
        embed_config: &EmbeddingConfig,
        query_text: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let query_vec = embedding::embed_query(embed_config, query_text).await?;

        let rows = sqlx::query("SELECT text, source, tag, embedding, position FROM entries")
            .fetch_all(&self.pool)
            .await?;

        struct Scored {
            chunk: RetrievedChunk,
            position: i64,
        }

        let mut scored: Vec<Scored> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = embedding::blob_to_vec(&blob);
                let score = embedding::cosine_similarity(&query_vec, &vec) as f64;
                Scored {
                    chunk: RetrievedChunk {
                        text: row.get("text"),
                        source: row.get("source"),
                        tag: row.get("tag"),
                        score,
                    },
                    position: row.get("position"),
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.chunk
                .score
                .partial_cmp(&a.chunk.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.position.cmp(&b.position))
        });
        scored.truncate(k);

        Ok(scored.into_iter().map(|s| s.chunk).collect())
    }

    pub async fn entry_count(&self) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await?)
    }

    /// Distinct source files represented in the index.
    pub async fn source_count(&self) -> Result<i64> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(DISTINCT source) FROM entries")
                .fetch_one(&self.pool)
                .await?,
        )
    }
}
