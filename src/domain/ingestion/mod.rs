//! Ingestion domain types: chunking configuration, chunks and strategy trait

pub mod chunker;

pub use chunker::{Chunk, ChunkMetadata, ChunkingConfig, ChunkingStrategy};
