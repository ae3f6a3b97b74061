pub mod answer;
pub mod cache;
pub mod config;
pub mod discover;
pub mod embeddings;
pub mod error;
pub mod index;
pub mod ingest;
pub mod pipeline;
pub mod progress;

pub use answer::{answer, Answer, AnswerModel, GeminiClient};
pub use cache::CacheStore;
pub use config::Config;
pub use embeddings::{EmbeddingProvider, OllamaEmbedder};
pub use error::{AskblogError, Result};
pub use index::VectorIndex;
pub use pipeline::{Pipeline, PipelineState};
pub use progress::{LogProgress, ProgressSink};
