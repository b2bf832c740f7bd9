//! Ingestion infrastructure: chunkers, normalization and the orchestrator

pub mod chunkers;
pub mod normalize;
pub mod pipeline;

pub use chunkers::FixedSizeChunker;
pub use pipeline::{IngestionPipeline, PipelineConfig, RetrievalService, RetryConfig};
