//! Domain layer - Core business logic and entities

pub mod classifier;
pub mod document;
pub mod embedding;
pub mod error;
pub mod ingestion;
pub mod run;
pub mod store;

pub use classifier::DomainClassifier;
pub use document::{DocumentDomain, DocumentRecord, FetchedDocument, NewDocument, StoredChunk};
pub use embedding::{cosine_similarity, EmbeddingProvider};
pub use error::DomainError;
pub use ingestion::{Chunk, ChunkMetadata, ChunkingConfig, ChunkingStrategy};
pub use run::{PipelineRun, RunRepository, RunStatus};
pub use store::{ChunkToStore, SearchHit, VectorStore};
