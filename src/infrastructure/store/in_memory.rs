//! In-memory vector store for development and testing

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::document::{DocumentDomain, DocumentRecord, NewDocument, StoredChunk};
use crate::domain::embedding::cosine_similarity;
use crate::domain::store::{validate_chunk_dimensions, ChunkToStore, SearchHit, VectorStore};
use crate::domain::DomainError;

/// In-memory vector store with exact cosine search.
///
/// Semantics match the pgvector store - idempotent upsert by `source_url`,
/// cascade delete, contiguous chunk indices, deterministic tie-breaks - so
/// the two are interchangeable behind the [`VectorStore`] trait. Search here
/// is an exact scan; callers must not depend on that, per the trait
/// contract.
#[derive(Debug)]
pub struct InMemoryVectorStore {
    dimensions: usize,
    state: Arc<RwLock<State>>,
}

#[derive(Debug, Default)]
struct State {
    documents: Vec<DocRow>,
    next_document_id: i64,
    next_chunk_id: i64,
}

#[derive(Debug, Clone)]
struct DocRow {
    record: DocumentRecord,
    chunks: Vec<StoredChunk>,
}

impl InMemoryVectorStore {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            state: Arc::new(RwLock::new(State {
                documents: Vec::new(),
                next_document_id: 1,
                next_chunk_id: 1,
            })),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn ensure_schema(&self) -> Result<(), DomainError> {
        Ok(())
    }

    async fn upsert_document(&self, document: &NewDocument) -> Result<i64, DomainError> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        if let Some(existing) = state
            .documents
            .iter_mut()
            .find(|row| row.record.source_url == document.source_url)
        {
            existing.record.title = document.title.clone();
            existing.record.content = document.content.clone();
            existing.record.domain = document.domain;
            existing.record.updated_at = now;
            // re-ingestion must never leave chunks from the previous version
            existing.chunks.clear();
            return Ok(existing.record.id);
        }

        let id = state.next_document_id;
        state.next_document_id += 1;
        state.documents.push(DocRow {
            record: DocumentRecord {
                id,
                title: document.title.clone(),
                source_url: document.source_url.clone(),
                content: document.content.clone(),
                domain: document.domain,
                created_at: now,
                updated_at: now,
            },
            chunks: Vec::new(),
        });

        Ok(id)
    }

    async fn insert_chunks(
        &self,
        document_id: i64,
        chunks: Vec<ChunkToStore>,
    ) -> Result<usize, DomainError> {
        validate_chunk_dimensions(&chunks, self.dimensions)?;

        let mut state = self.state.write().await;
        let mut next_chunk_id = state.next_chunk_id;

        let row = state
            .documents
            .iter_mut()
            .find(|row| row.record.id == document_id)
            .ok_or_else(|| {
                DomainError::not_found(format!("document {} does not exist", document_id))
            })?;

        let base_index = row.chunks.len() as i64;
        let now = Utc::now();
        let count = chunks.len();

        for (position, chunk) in chunks.into_iter().enumerate() {
            row.chunks.push(StoredChunk {
                id: next_chunk_id,
                document_id,
                chunk_text: chunk.content,
                chunk_index: base_index + position as i64,
                embedding: chunk.embedding,
                created_at: now,
            });
            next_chunk_id += 1;
        }

        state.next_chunk_id = next_chunk_id;
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

        if query_embedding.len() != self.dimensions {
            return Err(DomainError::invalid_argument(format!(
                "query embedding has dimension {}, expected {}",
                query_embedding.len(),
                self.dimensions
            )));
        }

        let state = self.state.read().await;
        let mut hits: Vec<SearchHit> = Vec::new();

        for row in &state.documents {
            if let Some(domain) = domain_filter {
                if row.record.domain != domain {
                    continue;
                }
            }

            for chunk in &row.chunks {
                hits.push(SearchHit {
                    chunk_id: chunk.id,
                    document_id: row.record.id,
                    chunk_text: chunk.chunk_text.clone(),
                    chunk_index: chunk.chunk_index,
                    similarity: cosine_similarity(query_embedding, &chunk.embedding),
                    document_title: row.record.title.clone(),
                    document_domain: row.record.domain,
                    source_url: row.record.source_url.clone(),
                });
            }
        }

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.chunk_index.cmp(&b.chunk_index))
                .then_with(|| a.document_id.cmp(&b.document_id))
        });
        hits.truncate(k);

        Ok(hits)
    }

    async fn get_document(
        &self,
        source_url: &str,
    ) -> Result<Option<DocumentRecord>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .iter()
            .find(|row| row.record.source_url == source_url)
            .map(|row| row.record.clone()))
    }

    async fn get_document_chunks(
        &self,
        document_id: i64,
    ) -> Result<Vec<StoredChunk>, DomainError> {
        let state = self.state.read().await;
        let mut chunks: Vec<StoredChunk> = state
            .documents
            .iter()
            .filter(|row| row.record.id == document_id)
            .flat_map(|row| row.chunks.iter().cloned())
            .collect();
        chunks.sort_by_key(|chunk| chunk.chunk_index);
        Ok(chunks)
    }

    async fn delete_document(&self, source_url: &str) -> Result<bool, DomainError> {
        let mut state = self.state.write().await;
        let before = state.documents.len();
        state
            .documents
            .retain(|row| row.record.source_url != source_url);
        Ok(state.documents.len() < before)
    }

    async fn document_count(&self) -> Result<usize, DomainError> {
        Ok(self.state.read().await.documents.len())
    }

    async fn chunk_count(&self) -> Result<usize, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .documents
            .iter()
            .map(|row| row.chunks.len())
            .sum())
    }

    async fn health_check(&self) -> Result<bool, DomainError> {
        Ok(true)
    }
}
