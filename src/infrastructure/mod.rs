//! Infrastructure layer - concrete implementations of the domain traits

pub mod classifier;
pub mod embedding;
pub mod ingestion;
pub mod logging;
pub mod run;
pub mod store;

pub use classifier::KeywordClassifier;
pub use embedding::{HttpEmbedderConfig, HttpEmbeddingProvider};
pub use ingestion::{
    FixedSizeChunker, IngestionPipeline, PipelineConfig, RetrievalService, RetryConfig,
};
pub use run::{InMemoryRunRepository, PostgresRunRepository};
pub use store::{InMemoryVectorStore, PgvectorConfig, PgvectorStore};
