use crate::embeddings::EmbeddingProvider;
use crate::error::{AskblogError, Result};
use crate::ingest::Chunk;
use crate::progress::{report, ProgressSink};
use serde::{Deserialize, Serialize};

/// Version of the persisted index format. Bump on any breaking change to
/// `VectorIndex`'s serialized shape.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// One indexed chunk: its embedding, text and provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub text: String,
    pub source_url: String,
    pub embedding: Vec<f32>,
}

/// Similarity-searchable vector index over a complete chunk set.
///
/// Immutable once built; never updated incrementally. Records the embedding
/// model and dimension so a cached index can be validated against the
/// provider that will serve query embeddings.
#[derive(Debug, Serialize, Deserialize)]
pub struct VectorIndex {
    version: u32,
    model: String,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Embed all chunks and construct the index.
    ///
    /// All-or-nothing: a failure embedding any chunk aborts construction and
    /// nothing is returned, so no partially built index can ever be persisted.
    pub async fn build(
        chunks: Vec<Chunk>,
        provider: &dyn EmbeddingProvider,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Self> {
        report(
            progress,
            &format!("Creating embeddings for {} chunks...", chunks.len()),
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = provider.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(AskblogError::Provider(format!(
                "Provider returned {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dimension) {
            return Err(AskblogError::Provider(format!(
                "Inconsistent embedding dimensions: {} vs {}",
                dimension,
                bad.len()
            )));
        }

        report(progress, "Building vector index...");

        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry {
                text: chunk.text,
                source_url: chunk.source_url,
                embedding,
            })
            .collect();

        Ok(Self {
            version: INDEX_FORMAT_VERSION,
            model: provider.model().to_string(),
            dimension,
            entries,
        })
    }

    /// Nearest-neighbor search by cosine similarity.
    ///
    /// Returns at most `k` entries, highest score first; ordering is stable
    /// for equal scores (index order breaks ties).
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(&IndexEntry, f32)>> {
        if query.len() != self.dimension {
            return Err(AskblogError::Provider(format!(
                "Query embedding dimension {} does not match index dimension {}",
                query.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(query, &entry.embedding)))
            .collect();

        // Stable sort keeps index order for equal scores
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| (&self.entries[i], score))
            .collect())
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Embedding model this index was built with
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cosine similarity between two equal-length vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
