// Embeddings module
// Document chunking, the embedding seam and the Ollama-backed implementation

pub mod chunking;
pub mod ollama;
pub mod retry;

pub use chunking::{Chunk, ChunkingConfig, chunk_text, word_count};
pub use ollama::OllamaClient;
pub use retry::{RetryPolicy, initialize_with_retry};

use crate::Result;

/// Maps text to fixed-dimension vectors.
///
/// Implementations must return one vector per input, in input order, each of
/// length [`Embedder::dimension`], and must be deterministic for a fixed model.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;

    /// Embed a single query string
    #[inline]
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()])?;
        if vectors.len() != 1 {
            return Err(crate::RagError::Embedding(format!(
                "expected exactly one embedding for query, got {}",
                vectors.len()
            )));
        }
        vectors
            .pop()
            .ok_or_else(|| crate::RagError::Embedding("empty embedding response".to_string()))
    }
}

/// Check that an embedder honored its output contract for `expected` inputs
#[inline]
pub fn validate_embeddings(
    vectors: &[Vec<f32>],
    expected: usize,
    dimension: usize,
) -> Result<()> {
    if vectors.len() != expected {
        return Err(crate::RagError::Embedding(format!(
            "Mismatch between request and response counts: {} vs {}",
            expected,
            vectors.len()
        )));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(crate::RagError::Embedding(format!(
            "Embedding has {} dimensions, expected {}",
            bad.len(),
            dimension
        )));
    }
    Ok(())
}
