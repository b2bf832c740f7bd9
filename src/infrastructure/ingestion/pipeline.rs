//! Ingestion orchestrator and retrieval service

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::domain::classifier::DomainClassifier;
use crate::domain::document::{DocumentDomain, FetchedDocument, NewDocument};
use crate::domain::embedding::EmbeddingProvider;
use crate::domain::ingestion::{ChunkingConfig, ChunkingStrategy};
use crate::domain::run::{PipelineRun, RunRepository, RunStatus};
use crate::domain::store::{ChunkToStore, SearchHit, VectorStore};
use crate::domain::DomainError;

use super::normalize;

/// Bounded backoff applied when the store reports a transient
/// connectivity failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per store operation, including the first
    pub max_attempts: u32,
    /// Base delay, doubled on every retry
    pub base_delay_ms: u64,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

/// Configuration for the ingestion pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub chunking: ChunkingConfig,
    pub retry: RetryConfig,
}

/// Orchestrates one ingestion run: for each fetched document,
/// normalize -> classify -> chunk -> embed -> upsert -> insert chunks,
/// accounting the outcome against a [`PipelineRun`] row as it goes.
///
/// Per-document failures are isolated: they are logged, counted in
/// `errors_count`, and the run proceeds. A document never leaves a partial
/// chunk set behind, because the chunk insert is transactional. The single
/// run-level failure mode is a store that stays unreachable after bounded
/// retries.
#[derive(Debug)]
pub struct IngestionPipeline {
    classifier: Arc<dyn DomainClassifier>,
    chunker: Arc<dyn ChunkingStrategy>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    runs: Arc<dyn RunRepository>,
    config: PipelineConfig,
}

impl IngestionPipeline {
    pub fn new(
        classifier: Arc<dyn DomainClassifier>,
        chunker: Arc<dyn ChunkingStrategy>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        runs: Arc<dyn RunRepository>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            classifier,
            chunker,
            embedder,
            store,
            runs,
            config,
        }
    }

    /// Process a batch of fetched documents and return the run summary.
    ///
    /// The summary always carries `documents_processed`, `chunks_generated`
    /// and `errors_count`, so callers can tell "succeeded with N partial
    /// failures" apart from "failed outright" (the latter returns an error
    /// after marking the run `failed`).
    pub async fn run_pipeline(
        &self,
        documents: Vec<FetchedDocument>,
    ) -> Result<PipelineRun, DomainError> {
        let started = Instant::now();
        let run = self.with_retry("start_run", || self.runs.start_run()).await?;
        let run_id = run.id();

        info!(run_id, documents = documents.len(), "Pipeline run started");

        for document in &documents {
            match self.process_document(document).await {
                Ok(chunks_stored) => {
                    if let Err(record_error) = self
                        .with_retry("record_document", || {
                            self.runs.record_document(run_id, chunks_stored as i64, false)
                        })
                        .await
                    {
                        return self.abort_run(run_id, started, record_error).await;
                    }
                }
                Err(process_error) if process_error.is_store_unavailable() => {
                    return self.abort_run(run_id, started, process_error).await;
                }
                Err(process_error) => {
                    warn!(
                        run_id,
                        source_url = %document.source_url,
                        error = %process_error,
                        "Document ingestion failed, continuing with next document"
                    );
                    if let Err(record_error) = self
                        .with_retry("record_document", || {
                            self.runs.record_document(run_id, 0, true)
                        })
                        .await
                    {
                        return self.abort_run(run_id, started, record_error).await;
                    }
                }
            }
        }

        let elapsed = started.elapsed().as_secs_f64();
        self.with_retry("finish_run", || {
            self.runs.finish_run(run_id, RunStatus::Success, elapsed)
        })
        .await?;

        let summary = self
            .runs
            .get_run(run_id)
            .await?
            .ok_or_else(|| DomainError::internal(format!("run {} vanished", run_id)))?;

        info!(
            run_id,
            documents_processed = summary.documents_processed(),
            chunks_generated = summary.chunks_generated(),
            errors_count = summary.errors_count(),
            execution_time_seconds = summary.execution_time_seconds(),
            "Pipeline run finished"
        );

        Ok(summary)
    }

    /// Ingest one document end to end. Returns the number of chunks stored.
    async fn process_document(&self, fetched: &FetchedDocument) -> Result<usize, DomainError> {
        let content = normalize::clean_text(&fetched.raw_text);
        let domain = self.classifier.classify(&content);
        let chunks = self.chunker.chunk(&content, &self.config.chunking)?;

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            // one oversized or empty chunk fails the whole document here;
            // no partial chunk set is ever written for it
            self.embedder.embed_batch(&texts).await?
        };

        let document = NewDocument::new(&fetched.title, &fetched.source_url, content, domain);
        let document_id = self
            .with_retry("upsert_document", || self.store.upsert_document(&document))
            .await?;

        let batch: Vec<ChunkToStore> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| ChunkToStore::new(chunk.content, embedding))
            .collect();

        let stored = self
            .with_retry("insert_chunks", || {
                self.store.insert_chunks(document_id, batch.clone())
            })
            .await?;

        debug!(
            source_url = %fetched.source_url,
            domain = %domain,
            chunks = stored,
            "Document ingested"
        );

        Ok(stored)
    }

    /// Retry an operation on transient store failures, with exponential
    /// backoff bounded by the retry configuration.
    async fn with_retry<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match call().await {
                Err(retryable)
                    if retryable.is_store_unavailable()
                        && attempt + 1 < self.config.retry.max_attempts =>
                {
                    let delay =
                        Duration::from_millis(self.config.retry.base_delay_ms << attempt);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %retryable,
                        "Store unavailable, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Mark the run failed (best effort - the store may be the thing that is
    /// down) and propagate the fatal error.
    async fn abort_run(
        &self,
        run_id: i64,
        started: Instant,
        fatal: DomainError,
    ) -> Result<PipelineRun, DomainError> {
        error!(run_id, error = %fatal, "Aborting pipeline run");

        let elapsed = started.elapsed().as_secs_f64();
        if let Err(finish_error) = self
            .runs
            .finish_run(run_id, RunStatus::Failed, elapsed)
            .await
        {
            error!(run_id, error = %finish_error, "Could not mark run as failed");
        }

        Err(fatal)
    }
}

/// Text-level read surface: embeds a query and delegates to the vector
/// store. The embedding-based [`VectorStore::search`] remains the canonical
/// interface.
#[derive(Debug)]
pub struct RetrievalService {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl RetrievalService {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Search with a text query
    pub async fn search_text(
        &self,
        query: &str,
        k: usize,
        domain_filter: Option<DocumentDomain>,
    ) -> Result<Vec<SearchHit>, DomainError> {
        if k == 0 {
            return Err(DomainError::invalid_argument("k must be greater than 0"));
        }

        let embedding = self.embedder.embed(query).await?;
        self.store.search(&embedding, k, domain_filter).await
    }

    /// Search with a precomputed query embedding
    pub async fn search_embedding(
        &self,
        query_embedding: &[f32],
        k: usize,
        domain_filter: Option<DocumentDomain>,
    ) -> Result<Vec<SearchHit>, DomainError> {
        self.store.search(query_embedding, k, domain_filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::classifier::mock::MockClassifier;
    use crate::domain::document::{DocumentRecord, StoredChunk};
    use crate::domain::embedding::provider::mock::MockEmbeddingProvider;
    use crate::infrastructure::ingestion::chunkers::FixedSizeChunker;
    use crate::infrastructure::run::InMemoryRunRepository;
    use crate::infrastructure::store::InMemoryVectorStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DIMS: usize = 8;

    struct Fixture {
        pipeline: IngestionPipeline,
        store: Arc<InMemoryVectorStore>,
        runs: Arc<InMemoryRunRepository>,
        embedder: Arc<MockEmbeddingProvider>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryVectorStore::new(DIMS));
        let runs = Arc::new(InMemoryRunRepository::new());
        let embedder = Arc::new(MockEmbeddingProvider::new(DIMS));

        let pipeline = IngestionPipeline::new(
            Arc::new(MockClassifier::new(DocumentDomain::Rh)),
            Arc::new(FixedSizeChunker::new()),
            embedder.clone(),
            store.clone(),
            runs.clone(),
            PipelineConfig {
                chunking: ChunkingConfig::new(40, 10),
                retry: RetryConfig::new(3, 1),
            },
        );

        Fixture {
            pipeline,
            store,
            runs,
            embedder,
        }
    }

    fn document(n: usize, body: &str) -> FetchedDocument {
        FetchedDocument::new(
            format!("Document {}", n),
            format!("https://example.fr/doc/{}", n),
            body.to_string(),
        )
    }

    #[tokio::test]
    async fn test_successful_run() {
        let f = fixture();
        let docs = vec![
            document(1, "Le salarié bénéficie d'une formation continue chaque année."),
            document(2, "L'employeur organise le temps de travail des équipes."),
        ];

        let run = f.pipeline.run_pipeline(docs).await.unwrap();

        assert_eq!(run.status(), RunStatus::Success);
        assert_eq!(run.documents_processed(), 2);
        assert_eq!(run.errors_count(), 0);
        assert!(run.chunks_generated() > 0);
        assert!(run.execution_time_seconds() >= 0.0);
        assert_eq!(f.store.document_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_partial_failures_do_not_abort_the_run() {
        let f = fixture();
        f.embedder.fail_on("poison");

        let mut docs = Vec::new();
        for n in 0..10 {
            let body = if n == 3 || n == 7 {
                format!("document {} contient du poison pour l'embarquement", n)
            } else {
                format!("document {} décrit la procédure applicable aux dossiers", n)
            };
            docs.push(document(n, &body));
        }

        let run = f.pipeline.run_pipeline(docs).await.unwrap();

        assert_eq!(run.status(), RunStatus::Success);
        assert_eq!(run.documents_processed(), 10);
        assert_eq!(run.errors_count(), 2);
        // chunks_generated only counts chunks actually persisted
        assert_eq!(
            run.chunks_generated() as usize,
            f.store.chunk_count().await.unwrap()
        );
        assert_eq!(f.store.document_count().await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_empty_document_counts_as_success_with_zero_chunks() {
        let f = fixture();

        let run = f
            .pipeline
            .run_pipeline(vec![document(1, "   \n  ")])
            .await
            .unwrap();

        assert_eq!(run.status(), RunStatus::Success);
        assert_eq!(run.documents_processed(), 1);
        assert_eq!(run.errors_count(), 0);
        assert_eq!(run.chunks_generated(), 0);
    }

    #[tokio::test]
    async fn test_failed_document_stores_no_chunks() {
        let f = fixture();
        f.embedder.fail_on("poison");

        let run = f
            .pipeline
            .run_pipeline(vec![document(1, "un peu de poison dans un texte assez long pour produire plusieurs chunks du document")])
            .await
            .unwrap();

        assert_eq!(run.errors_count(), 1);
        assert_eq!(f.store.chunk_count().await.unwrap(), 0);
        // the document row was never upserted either: embedding failed first
        assert_eq!(f.store.document_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_run_summary_matches_repository_row() {
        let f = fixture();
        let run = f
            .pipeline
            .run_pipeline(vec![document(1, "La subvention est versée sur demande.")])
            .await
            .unwrap();

        let stored = f.runs.get_run(run.id()).await.unwrap().unwrap();
        assert_eq!(stored.documents_processed(), run.documents_processed());
        assert_eq!(stored.chunks_generated(), run.chunks_generated());
        assert_eq!(stored.status(), RunStatus::Success);
    }

    /// Store whose upsert always reports a connectivity failure
    #[derive(Debug)]
    struct UnreachableStore {
        attempts: AtomicUsize,
    }

    impl UnreachableStore {
        fn new() -> Self {
            Self {
                attempts: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl VectorStore for UnreachableStore {
        async fn ensure_schema(&self) -> Result<(), DomainError> {
            Ok(())
        }

        async fn upsert_document(&self, _document: &NewDocument) -> Result<i64, DomainError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(DomainError::store_unavailable("connection refused"))
        }

        async fn insert_chunks(
            &self,
            _document_id: i64,
            _chunks: Vec<ChunkToStore>,
        ) -> Result<usize, DomainError> {
            Err(DomainError::store_unavailable("connection refused"))
        }

        async fn search(
            &self,
            _query_embedding: &[f32],
            _k: usize,
            _domain_filter: Option<DocumentDomain>,
        ) -> Result<Vec<SearchHit>, DomainError> {
            Err(DomainError::store_unavailable("connection refused"))
        }

        async fn get_document(
            &self,
            _source_url: &str,
        ) -> Result<Option<DocumentRecord>, DomainError> {
            Ok(None)
        }

        async fn get_document_chunks(
            &self,
            _document_id: i64,
        ) -> Result<Vec<StoredChunk>, DomainError> {
            Ok(Vec::new())
        }

        async fn delete_document(&self, _source_url: &str) -> Result<bool, DomainError> {
            Ok(false)
        }

        async fn document_count(&self) -> Result<usize, DomainError> {
            Ok(0)
        }

        async fn chunk_count(&self) -> Result<usize, DomainError> {
            Ok(0)
        }

        async fn health_check(&self) -> Result<bool, DomainError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_store_unavailable_fails_the_whole_run_after_retries() {
        let store = Arc::new(UnreachableStore::new());
        let runs = Arc::new(InMemoryRunRepository::new());

        let pipeline = IngestionPipeline::new(
            Arc::new(MockClassifier::new(DocumentDomain::Rh)),
            Arc::new(FixedSizeChunker::new()),
            Arc::new(MockEmbeddingProvider::new(DIMS)),
            store.clone(),
            runs.clone(),
            PipelineConfig {
                chunking: ChunkingConfig::new(40, 10),
                retry: RetryConfig::new(3, 1),
            },
        );

        let result = pipeline
            .run_pipeline(vec![document(1, "du contenu à ingérer")])
            .await;

        assert!(matches!(result, Err(DomainError::StoreUnavailable { .. })));
        // bounded backoff: exactly max_attempts upsert attempts
        assert_eq!(store.attempts.load(Ordering::SeqCst), 3);

        // the run row ends failed, not stuck in running
        let run = runs.get_run(1).await.unwrap().unwrap();
        assert_eq!(run.status(), RunStatus::Failed);
    }

    #[tokio::test]
    async fn test_retrieval_service_search_text() {
        let f = fixture();
        f.pipeline
            .run_pipeline(vec![document(
                1,
                "La formation des salariés est financée par l'employeur.",
            )])
            .await
            .unwrap();

        let retrieval = RetrievalService::new(f.embedder.clone(), f.store.clone());
        let hits = retrieval
            .search_text("formation des salariés", 5, None)
            .await
            .unwrap();

        assert!(!hits.is_empty());
        assert!(hits.len() <= 5);
    }

    #[tokio::test]
    async fn test_retrieval_service_rejects_k_zero() {
        let f = fixture();
        let retrieval = RetrievalService::new(f.embedder.clone(), f.store.clone());

        let result = retrieval.search_text("requête", 0, None).await;
        assert!(matches!(result, Err(DomainError::InvalidArgument { .. })));
    }
}
