//! RAG Ingestion Pipeline
//!
//! Ingests long-form documents into a vector-indexed store and serves
//! semantic similarity search:
//! - keyword-based domain classification over a closed label set
//! - overlap-aware fixed-size chunking
//! - embedding generation through an OpenAI-compatible endpoint
//! - idempotent storage in PostgreSQL + pgvector (or in memory)
//! - per-run monitoring with partial-failure accounting
//!
//! The network fetcher, scheduler and query-serving API are external
//! collaborators: this crate consumes `(title, source_url, raw_text)`
//! triples and exposes [`IngestionPipeline::run_pipeline`] as its write
//! surface and [`domain::VectorStore::search`] (plus the text-level
//! [`RetrievalService`]) as its read surface.

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{
    DocumentDomain, DomainError, FetchedDocument, PipelineRun, RunStatus, SearchHit,
};
pub use infrastructure::{IngestionPipeline, RetrievalService};

use std::sync::Arc;

use domain::ingestion::ChunkingConfig;
use domain::run::RunRepository;
use domain::store::VectorStore;
use infrastructure::{
    HttpEmbedderConfig, HttpEmbeddingProvider, InMemoryRunRepository, InMemoryVectorStore,
    KeywordClassifier, PgvectorConfig, PgvectorStore, PipelineConfig, PostgresRunRepository,
    RetryConfig,
};
use infrastructure::ingestion::FixedSizeChunker;
use tracing::info;

/// Everything a caller needs to drive the pipeline and query the store
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub retrieval: Arc<RetrievalService>,
    pub store: Arc<dyn VectorStore>,
    pub runs: Arc<dyn RunRepository>,
}

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let embedder_config = {
        let mut embedder_config = HttpEmbedderConfig::new(&config.embedding.base_url)
            .with_model(&config.embedding.model, config.embedding.dimensions)
            .with_max_input_chars(config.embedding.max_input_chars)
            .with_timeout_secs(config.embedding.timeout_secs);
        if let Some(ref api_key) = config.embedding.api_key {
            embedder_config = embedder_config.with_api_key(api_key);
        }
        embedder_config
    };
    let embedder = Arc::new(HttpEmbeddingProvider::new(embedder_config)?);

    let use_postgres = config.storage.backend != "in_memory";
    info!(backend = %config.storage.backend, "Vector store backend selected");

    let (store, runs): (Arc<dyn VectorStore>, Arc<dyn RunRepository>) = if use_postgres {
        let database_url = match config.database.url.clone() {
            Some(url) => url,
            None => std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
        };

        info!("Connecting to PostgreSQL...");
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&database_url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to PostgreSQL: {}", e))?;
        info!("PostgreSQL connection established");

        let mut pgvector_config = PgvectorConfig::new(config.embedding.dimensions);
        if let Some(probes) = config.search.ivfflat_probes {
            pgvector_config = pgvector_config.with_ivfflat_probes(probes);
        }

        let store = Arc::new(PgvectorStore::new(pool.clone(), pgvector_config));
        store.ensure_schema().await?;

        (store, Arc::new(PostgresRunRepository::new(pool)))
    } else {
        (
            Arc::new(InMemoryVectorStore::new(config.embedding.dimensions)),
            Arc::new(InMemoryRunRepository::new()),
        )
    };

    let pipeline_config = PipelineConfig {
        chunking: ChunkingConfig::new(config.chunking.chunk_size, config.chunking.chunk_overlap),
        retry: RetryConfig::new(config.retry.max_attempts, config.retry.base_delay_ms),
    };
    pipeline_config.chunking.validate()?;

    let pipeline = Arc::new(IngestionPipeline::new(
        Arc::new(KeywordClassifier::default()),
        Arc::new(FixedSizeChunker::new()),
        embedder.clone(),
        store.clone(),
        runs.clone(),
        pipeline_config,
    ));

    let retrieval = Arc::new(RetrievalService::new(embedder, store.clone()));

    Ok(AppState {
        pipeline,
        retrieval,
        store,
        runs,
    })
}
