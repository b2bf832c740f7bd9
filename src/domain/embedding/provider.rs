//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::DomainError;

/// Trait for embedding providers.
///
/// Given a fixed model version, implementations are deterministic: the same
/// text always maps to the same vector. All vectors produced by one provider
/// share the dimension reported by [`EmbeddingProvider::dimensions`].
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError>;

    /// Generate embeddings for a batch of texts.
    ///
    /// Order is preserved: `result[i]` is the embedding of `texts[i]`, and
    /// the result length always equals the input length on success.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError>;

    /// Get the embedding dimensions for this provider's model
    fn dimensions(&self) -> usize;
}

/// Validate embedding input against the provider's character budget.
///
/// Empty (or whitespace-only) input and oversized input are rejected rather
/// than silently truncated, so callers can account the failure per chunk.
pub fn validate_input(text: &str, max_chars: usize) -> Result<(), DomainError> {
    if text.trim().is_empty() {
        return Err(DomainError::input_empty("cannot embed empty text"));
    }

    let char_count = text.chars().count();
    if char_count > max_chars {
        return Err(DomainError::input_too_large(format!(
            "input is {} characters, maximum is {}",
            char_count, max_chars
        )));
    }

    Ok(())
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const DEFAULT_MAX_INPUT_CHARS: usize = 8192;

    /// Mock embedding provider generating deterministic vectors from a text
    /// hash, with optional fixed vectors per text.
    #[derive(Debug)]
    pub struct MockEmbeddingProvider {
        dimensions: usize,
        max_input_chars: usize,
        fixed: Mutex<HashMap<String, Vec<f32>>>,
        fail_on: Mutex<Option<String>>,
    }

    impl MockEmbeddingProvider {
        pub fn new(dimensions: usize) -> Self {
            Self {
                dimensions,
                max_input_chars: DEFAULT_MAX_INPUT_CHARS,
                fixed: Mutex::new(HashMap::new()),
                fail_on: Mutex::new(None),
            }
        }

        pub fn with_max_input_chars(mut self, max_chars: usize) -> Self {
            self.max_input_chars = max_chars;
            self
        }

        /// Return a fixed vector for a specific text
        pub fn set_embedding(&self, text: &str, embedding: Vec<f32>) {
            self.fixed
                .lock()
                .unwrap()
                .insert(text.to_string(), embedding);
        }

        /// Fail any request whose text contains the given marker
        pub fn fail_on(&self, marker: impl Into<String>) {
            *self.fail_on.lock().unwrap() = Some(marker.into());
        }

        fn embed_one(&self, text: &str) -> Result<Vec<f32>, DomainError> {
            validate_input(text, self.max_input_chars)?;

            if let Some(ref marker) = *self.fail_on.lock().unwrap() {
                if text.contains(marker.as_str()) {
                    return Err(DomainError::provider("mock", "configured to fail"));
                }
            }

            if let Some(fixed) = self.fixed.lock().unwrap().get(text) {
                return Ok(fixed.clone());
            }

            let hash = text.bytes().fold(0u64, |acc, b| {
                acc.wrapping_mul(31).wrapping_add(b as u64)
            });
            Ok((0..self.dimensions)
                .map(|i| ((hash.wrapping_add(i as u64) % 1000) as f32 / 1000.0) - 0.5)
                .collect())
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbeddingProvider {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
            self.embed_one(text)
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
            texts.iter().map(|text| self.embed_one(text)).collect()
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_provider_deterministic() {
            let provider = MockEmbeddingProvider::new(128);

            let first = provider.embed("Bonjour").await.unwrap();
            let second = provider.embed("Bonjour").await.unwrap();

            assert_eq!(first, second);
            assert_eq!(first.len(), 128);
        }

        #[tokio::test]
        async fn test_mock_provider_batch_order() {
            let provider = MockEmbeddingProvider::new(64);
            let texts = vec!["un".to_string(), "deux".to_string(), "trois".to_string()];

            let batch = provider.embed_batch(&texts).await.unwrap();

            assert_eq!(batch.len(), 3);
            for (i, text) in texts.iter().enumerate() {
                assert_eq!(batch[i], provider.embed(text).await.unwrap());
            }
        }

        #[tokio::test]
        async fn test_mock_provider_rejects_empty() {
            let provider = MockEmbeddingProvider::new(64);

            let result = provider.embed("   ").await;
            assert!(matches!(result, Err(DomainError::InputEmpty { .. })));
        }

        #[tokio::test]
        async fn test_mock_provider_rejects_oversized() {
            let provider = MockEmbeddingProvider::new(64).with_max_input_chars(10);

            let result = provider.embed("this text is longer than ten characters").await;
            assert!(matches!(result, Err(DomainError::InputTooLarge { .. })));
        }

        #[tokio::test]
        async fn test_mock_provider_fixed_embedding() {
            let provider = MockEmbeddingProvider::new(3);
            provider.set_embedding("pivot", vec![1.0, 0.0, 0.0]);

            assert_eq!(provider.embed("pivot").await.unwrap(), vec![1.0, 0.0, 0.0]);
        }

        #[tokio::test]
        async fn test_mock_provider_fail_marker() {
            let provider = MockEmbeddingProvider::new(3);
            provider.fail_on("poison");

            assert!(provider.embed("clean text").await.is_ok());
            assert!(provider.embed("some poison here").await.is_err());
        }
    }
}
