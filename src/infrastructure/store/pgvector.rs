//! pgvector-backed vector store implementation

use std::fmt::Debug;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::document::{DocumentDomain, DocumentRecord, NewDocument, StoredChunk};
use crate::domain::store::{validate_chunk_dimensions, ChunkToStore, SearchHit, VectorStore};
use crate::domain::DomainError;

use super::migrations::run_storage_migrations;

/// Configuration for the pgvector store
#[derive(Debug, Clone)]
pub struct PgvectorConfig {
    /// Embedding dimensions enforced on every stored and queried vector
    pub dimensions: usize,
    /// IVFFlat probe count applied per query (`SET LOCAL ivfflat.probes`).
    ///
    /// This is the recall/latency knob of the approximate index: more probes,
    /// better recall, slower queries. `None` keeps the server default.
    pub ivfflat_probes: Option<u32>,
}

impl PgvectorConfig {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            ivfflat_probes: None,
        }
    }

    pub fn with_ivfflat_probes(mut self, probes: u32) -> Self {
        self.ivfflat_probes = Some(probes);
        self
    }
}

/// Vector store backed by PostgreSQL + pgvector.
///
/// Cosine distance uses the `<=>` operator; similarity is `1 - distance`.
/// Same-URL re-ingestion is serialized by the `UNIQUE (source_url)`
/// constraint plus the transactional upsert, and each document's chunk batch
/// is written in a single transaction.
pub struct PgvectorStore {
    pool: PgPool,
    config: PgvectorConfig,
}

impl Debug for PgvectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgvectorStore")
            .field("config", &self.config)
            .finish()
    }
}

impl PgvectorStore {
    pub fn new(pool: PgPool, config: PgvectorConfig) -> Self {
        Self { pool, config }
    }

    fn embedding_to_pgvector(embedding: &[f32]) -> String {
        let values: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
        format!("[{}]", values.join(","))
    }
}

/// Map an sqlx error onto the domain taxonomy: connectivity-class failures
/// are retryable (`StoreUnavailable`), everything else is a storage error.
fn map_sqlx_error(context: &str, error: sqlx::Error) -> DomainError {
    match error {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => {
            DomainError::store_unavailable(format!("{}: {}", context, error))
        }
        other => DomainError::storage(format!("{}: {}", context, other)),
    }
}

/// Parse a pgvector string representation back to a Vec<f32>
fn parse_pgvector(s: &str) -> Result<Vec<f32>, DomainError> {
    let trimmed = s.trim_start_matches('[').trim_end_matches(']');
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let values: Result<Vec<f32>, _> = trimmed.split(',').map(|v| v.trim().parse::<f32>()).collect();
    values.map_err(|e| DomainError::storage(format!("Failed to parse vector: {}", e)))
}

fn parse_domain(raw: &str) -> DocumentDomain {
    DocumentDomain::from_str(raw).unwrap_or(DocumentDomain::Unknown)
}

#[async_trait]
impl VectorStore for PgvectorStore {
    async fn ensure_schema(&self) -> Result<(), DomainError> {
        run_storage_migrations(&self.pool, self.config.dimensions).await
    }

    async fn upsert_document(&self, document: &NewDocument) -> Result<i64, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("Failed to begin transaction", e))?;

        let row = sqlx::query(
            r#"
            INSERT INTO documents (title, source_url, content, domain)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (source_url) DO UPDATE SET
                title = EXCLUDED.title,
                content = EXCLUDED.content,
                domain = EXCLUDED.domain,
                updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(&document.title)
        .bind(&document.source_url)
        .bind(&document.content)
        .bind(document.domain.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to upsert document", e))?;

        let document_id: i64 = row.get("id");

        // drop chunks from any previous version of this document before the
        // new batch is inserted
        sqlx::query("DELETE FROM text_chunks WHERE document_id = $1")
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete stale chunks", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("Failed to commit upsert", e))?;

        Ok(document_id)
    }

    async fn insert_chunks(
        &self,
        document_id: i64,
        chunks: Vec<ChunkToStore>,
    ) -> Result<usize, DomainError> {
        validate_chunk_dimensions(&chunks, self.config.dimensions)?;

        if chunks.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("Failed to begin transaction", e))?;

        let base_index: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(chunk_index) + 1, 0) FROM text_chunks WHERE document_id = $1",
        )
        .bind(document_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to read chunk index", e))?;

        let count = chunks.len();
        for (position, chunk) in chunks.into_iter().enumerate() {
            let embedding = Self::embedding_to_pgvector(&chunk.embedding);

            sqlx::query(
                r#"
                INSERT INTO text_chunks (document_id, chunk_text, chunk_index, embedding)
                VALUES ($1, $2, $3, $4::vector)
                "#,
            )
            .bind(document_id)
            .bind(&chunk.content)
            .bind(base_index + position as i64)
            .bind(&embedding)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to insert chunk", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("Failed to commit chunk batch", e))?;

        Ok(count)
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        domain_filter: Option<DocumentDomain>,
    ) -> Result<Vec<SearchHit>, DomainError> {
        if k == 0 {
            return Err(DomainError::invalid_argument("k must be greater than 0"));
        }

        if query_embedding.len() != self.config.dimensions {
            return Err(DomainError::invalid_argument(format!(
                "query embedding has dimension {}, expected {}",
                query_embedding.len(),
                self.config.dimensions
            )));
        }

        let embedding = Self::embedding_to_pgvector(query_embedding);

        let domain_sql = match domain_filter {
            Some(_) => " AND d.domain = $2",
            None => "",
        };

        let query = format!(
            r#"
            SELECT
                tc.id AS chunk_id,
                tc.chunk_text,
                tc.chunk_index,
                d.id AS document_id,
                d.title AS document_title,
                d.domain,
                d.source_url,
                1 - (tc.embedding <=> $1::vector) AS similarity
            FROM text_chunks tc
            JOIN documents d ON tc.document_id = d.id
            WHERE TRUE{domain_sql}
            ORDER BY tc.embedding <=> $1::vector ASC, tc.chunk_index ASC, d.id ASC
            LIMIT {k}
            "#
        );

        // probes are transaction-scoped, so the whole query runs inside one
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("Failed to begin transaction", e))?;

        if let Some(probes) = self.config.ivfflat_probes {
            sqlx::query(&format!("SET LOCAL ivfflat.probes = {}", probes))
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("Failed to set ivfflat probes", e))?;
        }

        let mut query_builder = sqlx::query(&query).bind(&embedding);
        if let Some(domain) = domain_filter {
            query_builder = query_builder.bind(domain.as_str());
        }

        let rows = query_builder
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("Search failed", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("Failed to commit search", e))?;

        let hits = rows
            .into_iter()
            .map(|row| SearchHit {
                chunk_id: row.get("chunk_id"),
                document_id: row.get("document_id"),
                chunk_text: row.get("chunk_text"),
                chunk_index: row.get("chunk_index"),
                similarity: row.get::<f64, _>("similarity") as f32,
                document_title: row.get("document_title"),
                document_domain: parse_domain(row.get::<String, _>("domain").as_str()),
                source_url: row.get("source_url"),
            })
            .collect();

        Ok(hits)
    }

    async fn get_document(
        &self,
        source_url: &str,
    ) -> Result<Option<DocumentRecord>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, title, source_url, content, domain, created_at, updated_at
            FROM documents
            WHERE source_url = $1
            "#,
        )
        .bind(source_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to get document", e))?;

        Ok(row.map(|row| DocumentRecord {
            id: row.get("id"),
            title: row.get("title"),
            source_url: row.get("source_url"),
            content: row.get("content"),
            domain: parse_domain(row.get::<String, _>("domain").as_str()),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }))
    }

    async fn get_document_chunks(
        &self,
        document_id: i64,
    ) -> Result<Vec<StoredChunk>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, document_id, chunk_text, chunk_index, embedding::text AS embedding, created_at
            FROM text_chunks
            WHERE document_id = $1
            ORDER BY chunk_index
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to get chunks", e))?;

        rows.into_iter()
            .map(|row| {
                let embedding = parse_pgvector(row.get::<String, _>("embedding").as_str())?;
                Ok(StoredChunk {
                    id: row.get("id"),
                    document_id: row.get("document_id"),
                    chunk_text: row.get("chunk_text"),
                    chunk_index: row.get("chunk_index"),
                    embedding,
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }

    async fn delete_document(&self, source_url: &str) -> Result<bool, DomainError> {
        // chunks go with the document via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM documents WHERE source_url = $1")
            .bind(source_url)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete document", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn document_count(&self) -> Result<usize, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to count documents", e))?;

        Ok(count as usize)
    }

    async fn chunk_count(&self) -> Result<usize, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM text_chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to count chunks", e))?;

        Ok(count as usize)
    }

    async fn health_check(&self) -> Result<bool, DomainError> {
        let one: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Health check failed", e))?;

        Ok(one == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_to_pgvector_format() {
        let formatted = PgvectorStore::embedding_to_pgvector(&[0.1, -0.5, 1.0]);
        assert_eq!(formatted, "[0.1,-0.5,1]");
    }

    #[test]
    fn test_parse_pgvector() {
        let parsed = parse_pgvector("[0.1, 0.2, 0.3]").unwrap();
        assert_eq!(parsed.len(), 3);
        assert!((parsed[0] - 0.1).abs() < 0.001);
        assert!((parsed[2] - 0.3).abs() < 0.001);
    }

    #[test]
    fn test_parse_pgvector_empty() {
        assert!(parse_pgvector("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_pgvector_invalid() {
        assert!(parse_pgvector("[a,b]").is_err());
    }

    #[test]
    fn test_parse_domain_fallback() {
        assert_eq!(parse_domain("rh"), DocumentDomain::Rh);
        assert_eq!(parse_domain("corrupted"), DocumentDomain::Unknown);
    }

    #[test]
    fn test_pgvector_config() {
        let config = PgvectorConfig::new(384).with_ivfflat_probes(10);

        assert_eq!(config.dimensions, 384);
        assert_eq!(config.ivfflat_probes, Some(10));
    }
}
