//! Text embedding backends.

use std::sync::Arc;

use anyhow::Result;

mod cache;
pub mod openai;

pub use cache::CachedEmbedder;
pub use openai::OpenAiEmbedder;

/// Turns texts into fixed-dimension vectors.
///
/// Implementations return exactly one vector per input, in input order, and
/// must be safe to call from several requests at once.
pub trait Embedder: Send + Sync {
    /// Embeds a batch of texts.
    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
}

impl<E: Embedder + ?Sized> Embedder for Arc<E> {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        (**self).encode(texts)
    }
}
