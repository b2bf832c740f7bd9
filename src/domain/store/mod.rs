//! Vector store trait and query types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::document::{DocumentDomain, DocumentRecord, NewDocument, StoredChunk};
use crate::domain::DomainError;

/// A chunk paired with its embedding, ready for storage.
///
/// `chunk_index` is not part of this type: the store assigns indices from
/// sequence position at insert time, which is what keeps them contiguous.
#[derive(Debug, Clone)]
pub struct ChunkToStore {
    pub content: String,
    pub embedding: Vec<f32>,
}

impl ChunkToStore {
    pub fn new(content: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            content: content.into(),
            embedding,
        }
    }
}

/// One nearest-neighbor search result: a chunk joined with its owning
/// document and the cosine similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk_id: i64,
    pub document_id: i64,
    pub chunk_text: String,
    pub chunk_index: i64,
    /// Cosine similarity in `[-1, 1]`, unrounded
    pub similarity: f32,
    pub document_title: String,
    pub document_domain: DocumentDomain,
    pub source_url: String,
}

/// Persistence boundary of the pipeline: documents, chunk embeddings and
/// nearest-neighbor queries.
///
/// Contract highlights:
/// - `upsert_document` is idempotent on `source_url`: re-ingesting a URL
///   replaces title/content/domain, advances `updated_at`, and drops the
///   document's previous chunks in the same transaction.
/// - `insert_chunks` is all-or-nothing per document; a partially-chunked
///   document is never visible to queries.
/// - `search` may be served by an approximate index; exact and approximate
///   backends expose the identical interface, and callers must not assume
///   exact top-k under an approximate configuration.
#[async_trait]
pub trait VectorStore: Send + Sync + Debug {
    /// Create tables and indexes if they do not exist
    async fn ensure_schema(&self) -> Result<(), DomainError>;

    /// Insert or replace a document, keyed by `source_url`. Returns the
    /// document id.
    async fn upsert_document(&self, document: &NewDocument) -> Result<i64, DomainError>;

    /// Insert a document's chunks as one atomic unit, assigning
    /// `chunk_index` from sequence position. Every embedding dimension is
    /// validated before any row is written. Returns the number of chunks
    /// stored.
    async fn insert_chunks(
        &self,
        document_id: i64,
        chunks: Vec<ChunkToStore>,
    ) -> Result<usize, DomainError>;

    /// Return the `k` chunks most similar to `query_embedding`, optionally
    /// restricted to documents with the given domain.
    ///
    /// Results are sorted by non-increasing similarity; ties break by
    /// ascending `chunk_index`, then ascending `document_id`. `k == 0` is
    /// rejected with `InvalidArgument`; `k` beyond the corpus size returns
    /// every available result without padding.
    async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        domain_filter: Option<DocumentDomain>,
    ) -> Result<Vec<SearchHit>, DomainError>;

    /// Fetch a document by its source URL
    async fn get_document(&self, source_url: &str)
        -> Result<Option<DocumentRecord>, DomainError>;

    /// Fetch a document's chunks ordered by `chunk_index`
    async fn get_document_chunks(&self, document_id: i64)
        -> Result<Vec<StoredChunk>, DomainError>;

    /// Delete a document (and, by cascade, its chunks). Returns whether a
    /// document existed.
    async fn delete_document(&self, source_url: &str) -> Result<bool, DomainError>;

    /// Total number of stored documents
    async fn document_count(&self) -> Result<usize, DomainError>;

    /// Total number of stored chunks
    async fn chunk_count(&self) -> Result<usize, DomainError>;

    /// Check that the store is reachable
    async fn health_check(&self) -> Result<bool, DomainError>;
}

/// Validate that every embedding in a chunk batch has the expected
/// dimension. Shared by store implementations so mismatches are rejected
/// before anything touches storage.
pub fn validate_chunk_dimensions(
    chunks: &[ChunkToStore],
    expected: usize,
) -> Result<(), DomainError> {
    for (position, chunk) in chunks.iter().enumerate() {
        if chunk.embedding.len() != expected {
            return Err(DomainError::invalid_argument(format!(
                "chunk at position {} has embedding dimension {}, expected {}",
                position,
                chunk.embedding.len(),
                expected
            )));
        }
    }
    Ok(())
}
