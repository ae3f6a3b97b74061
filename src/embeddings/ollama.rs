use crate::embeddings::{EmbeddingProvider, QueryEmbeddingCache};
use crate::error::{AskblogError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Texts per request against the Ollama embed endpoint
const BATCH_SIZE: usize = 32;

/// Request structure for the Ollama embed API
#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

/// Response structure from the Ollama embed API
#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Ollama embeddings client.
///
/// Talks to a local Ollama instance (`POST {host}/api/embed`). The expected
/// vector dimension comes from configuration; any response vector of a
/// different length is treated as a provider error. Optionally caches query
/// embeddings in an LRU to avoid re-embedding repeated questions.
pub struct OllamaEmbedder {
    client: Client,
    host: String,
    model: String,
    dimension: usize,
    cache: Option<Arc<QueryEmbeddingCache>>,
}

impl OllamaEmbedder {
    /// Create a new embedder against `host` (e.g. `http://localhost:11434`)
    pub fn new(host: String, model: String, dimension: usize, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AskblogError::Transport)?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            model,
            dimension,
            cache: None,
        })
    }

    /// Attach an LRU cache for query embeddings
    pub fn with_cache(mut self, cache: Arc<QueryEmbeddingCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    async fn embed_request(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = texts.len();
        let request = EmbedRequest {
            model: self.model.clone(),
            input: texts,
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.host))
            .json(&request)
            .send()
            .await
            .map_err(|e| AskblogError::Provider(format!("Ollama request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error response".to_string());
            return Err(AskblogError::Provider(format!(
                "Ollama API error {}: {}",
                status, body
            )));
        }

        let result: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AskblogError::Provider(format!("Failed to parse Ollama response: {}", e)))?;

        if result.embeddings.len() != expected {
            return Err(AskblogError::Provider(format!(
                "Ollama returned {} embeddings for {} inputs",
                result.embeddings.len(),
                expected
            )));
        }

        if let Some(bad) = result.embeddings.iter().find(|e| e.len() != self.dimension) {
            return Err(AskblogError::Provider(format!(
                "Unexpected embedding dimension from {}: expected {}, got {}",
                self.model,
                self.dimension,
                bad.len()
            )));
        }

        Ok(result.embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            let embeddings = self.embed_request(batch.to_vec()).await?;
            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(text) {
                log::debug!("Query embedding cache hit");
                return Ok(cached);
            }
        }

        let mut embeddings = self.embed_request(vec![text.to_string()]).await?;
        let embedding = embeddings.remove(0);

        if let Some(cache) = &self.cache {
            cache.put(text.to_string(), embedding.clone());
        }

        Ok(embedding)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
