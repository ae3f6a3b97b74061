pub mod ollama;

pub use ollama::OllamaEmbedder;

use crate::error::Result;
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// External embedding capability.
///
/// The same provider (and model) must be used at index-build time and at
/// query time; the index records the model name and vector dimension so a
/// mismatch is caught on load rather than producing silent nonsense scores.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier, stored alongside the index for validation
    fn model(&self) -> &str;

    /// Vector dimension this provider produces. Checked against a cached
    /// index at load time so a model variant with a different dimension is
    /// rejected before the first query.
    fn dimension(&self) -> usize;
}

/// Thread-safe LRU cache for query embeddings.
///
/// Avoids re-embedding a query the user asks twice in one session. Index
/// chunks are never cached here; they are embedded exactly once per build.
pub struct QueryEmbeddingCache {
    cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl QueryEmbeddingCache {
    /// Create a cache with the given capacity (clamped to at least 1)
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).expect("capacity clamped to at least 1");
        Self {
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn get(&self, query: &str) -> Option<Vec<f32>> {
        self.cache.lock().unwrap().get(query).cloned()
    }

    pub fn put(&self, query: String, embedding: Vec<f32>) {
        self.cache.lock().unwrap().put(query, embedding);
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::EmbeddingProvider;
    use crate::error::{AskblogError, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Deterministic in-process embedder for tests.
    ///
    /// Unknown texts get a stable hash-derived vector; specific texts can be
    /// pinned to handpicked vectors to steer retrieval.
    pub struct MockEmbeddingProvider {
        dimension: usize,
        pinned: HashMap<String, Vec<f32>>,
        fail: bool,
    }

    impl MockEmbeddingProvider {
        pub fn new(dimension: usize) -> Self {
            Self {
                dimension,
                pinned: HashMap::new(),
                fail: false,
            }
        }

        pub fn with_response(mut self, text: &str, embedding: Vec<f32>) -> Self {
            self.pinned.insert(text.to_string(), embedding);
            self
        }

        /// Every call fails, for all-or-nothing build tests
        pub fn failing() -> Self {
            Self {
                dimension: 4,
                pinned: HashMap::new(),
                fail: true,
            }
        }

        fn embed_one(&self, text: &str) -> Vec<f32> {
            if let Some(v) = self.pinned.get(text) {
                return v.clone();
            }
            let seed: u32 = text.bytes().fold(17u32, |acc, b| {
                acc.wrapping_mul(31).wrapping_add(b as u32)
            });
            (0..self.dimension)
                .map(|i| {
                    let x = seed.wrapping_add(i as u32).wrapping_mul(2654435761);
                    (x % 1000) as f32 / 1000.0
                })
                .collect()
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbeddingProvider {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if self.fail {
                return Err(AskblogError::Provider("mock embedder failure".to_string()));
            }
            Ok(texts.iter().map(|t| self.embed_one(t)).collect())
        }

        async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            if self.fail {
                return Err(AskblogError::Provider("mock embedder failure".to_string()));
            }
            Ok(self.embed_one(text))
        }

        fn model(&self) -> &str {
            "mock-embedder"
        }

        fn dimension(&self) -> usize {
            self.dimension
        }
    }
}
