//! Embedding provider implementations

mod http;

pub use http::{HttpEmbedderConfig, HttpEmbeddingProvider};
