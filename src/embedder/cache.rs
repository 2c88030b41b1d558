use std::num::NonZeroUsize;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use lru::LruCache;

use super::Embedder;

/// Memoizes embeddings per exact input text.
///
/// Only cache misses reach the inner embedder, sent together in one batch.
pub struct CachedEmbedder<E> {
    inner: E,
    cache: Option<Mutex<LruCache<String, Vec<f32>>>>,
}

impl<E: Embedder> CachedEmbedder<E> {
    /// Wraps `inner` with an LRU of `capacity` entries (0 disables caching).
    pub fn new(inner: E, capacity: usize) -> Self {
        let cache = NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap)));
        Self { inner, cache }
    }
}

impl<E: Embedder> Embedder for CachedEmbedder<E> {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let Some(cache) = &self.cache else {
            return self.inner.encode(texts);
        };

        let mut slots: Vec<Option<Vec<f32>>> = {
            let mut guard = cache
                .lock()
                .map_err(|_| anyhow!("embedding cache lock poisoned"))?;
            texts.iter().map(|text| guard.get(*text).cloned()).collect()
        };

        let mut misses: Vec<&str> = Vec::new();
        for (slot, text) in slots.iter().zip(texts) {
            if slot.is_none() && !misses.contains(text) {
                misses.push(*text);
            }
        }
        if misses.is_empty() {
            return Ok(slots.into_iter().flatten().collect());
        }

        let fresh = self.inner.encode(&misses)?;
        anyhow::ensure!(
            fresh.len() == misses.len(),
            "embedder returned {} vectors for {} inputs",
            fresh.len(),
            misses.len()
        );

        {
            let mut guard = cache
                .lock()
                .map_err(|_| anyhow!("embedding cache lock poisoned"))?;
            for (text, vector) in misses.iter().zip(&fresh) {
                guard.put((*text).to_string(), vector.clone());
            }
        }

        for (slot, text) in slots.iter_mut().zip(texts) {
            if slot.is_none() {
                let idx = misses
                    .iter()
                    .position(|miss| miss == text)
                    .ok_or_else(|| anyhow!("cache miss bookkeeping lost {text:?}"))?;
                *slot = Some(fresh[idx].clone());
            }
        }
        Ok(slots.into_iter().flatten().collect())
    }
}
