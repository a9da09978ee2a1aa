// Embeddings module
// Text chunking and the embedding provider boundary

pub mod chunking;
pub mod openai;

use thiserror::Error;

pub use chunking::{ChunkingConfig, chunk_text};
pub use openai::OpenAiClient;

/// Failure talking to an embedding provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingError {
    /// Timeouts, dropped connections, rate limiting and server errors.
    /// Retrying the same request later may succeed.
    #[error("transient provider failure: {0}")]
    Transient(String),

    #[error("provider rejected the request: {0}")]
    Permanent(String),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl EmbeddingError {
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Anything that turns a piece of text into a fixed-dimension vector.
///
/// Calls block until the provider answers. Implementations must return
/// vectors of the same length for every input.
pub trait Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

impl<E: Embedder + ?Sized> Embedder for &E {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        (**self).embed(text)
    }
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        (**self).embed(text)
    }
}
