use crate::error::{AskblogError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub blog: BlogConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Blog crawling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BlogConfig {
    #[serde(default = "default_start_url")]
    pub start_url: String,
    /// Page budget for link discovery; discovery stops here even if older pages exist
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Delay between page fetches, to stay polite against the source site
    #[serde(default = "default_fetch_delay_ms")]
    pub fetch_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Document chunking configuration (both in characters)
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

/// Embedding provider configuration (Ollama)
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_embeddings_host")]
    pub host: String,
    #[serde(default = "default_embeddings_model")]
    pub model: String,
    /// Vector dimension the model produces; checked against every response
    /// and against cached indexes on load
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
    /// Capacity of the in-memory query-embedding cache; 0 disables it
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

/// Answer-generation provider configuration (Gemini)
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerConfig {
    #[serde(default = "default_answer_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Number of chunks retrieved per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

/// On-disk cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,
}

fn default_start_url() -> String {
    "https://android-developers.googleblog.com/".to_string()
}

fn default_max_pages() -> usize {
    5
}

fn default_fetch_delay_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_embeddings_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_embeddings_model() -> String {
    "mxbai-embed-large".to_string()
}

fn default_embedding_dimension() -> usize {
    1024
}

fn default_cache_capacity() -> usize {
    256
}

fn default_answer_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.5
}

fn default_top_k() -> usize {
    4
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("context")
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            start_url: default_start_url(),
            max_pages: default_max_pages(),
            fetch_delay_ms: default_fetch_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            host: default_embeddings_host(),
            model: default_embeddings_model(),
            dimension: default_embedding_dimension(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            model: default_answer_model(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            top_k: default_top_k(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            build_dir: default_build_dir(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blog: BlogConfig::default(),
            chunking: ChunkingConfig::default(),
            embeddings: EmbeddingsConfig::default(),
            answer: AnswerConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// Loads environment variables from .env (if present) first, then resolves
    /// the config file in this order:
    /// 1. Path in the ASKBLOG_CONFIG environment variable (must exist)
    /// 2. ./config.toml in the current directory, if present
    /// 3. Built-in defaults otherwise
    pub fn load() -> Result<Self> {
        // .env is optional; ignore errors
        let _ = dotenv::dotenv();

        let config = match std::env::var("ASKBLOG_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => {
                let default_path = Path::new("config.toml");
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path).map_err(|e| {
            AskblogError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&config_str)
            .map_err(|e| AskblogError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Validate configuration values. Rejected before any I/O happens.
    pub fn validate(&self) -> Result<()> {
        if self.blog.start_url.is_empty() {
            return Err(AskblogError::Config(
                "blog.start_url must not be empty".to_string(),
            ));
        }

        if self.blog.max_pages == 0 {
            return Err(AskblogError::Config(
                "blog.max_pages must be greater than 0".to_string(),
            ));
        }

        if self.chunking.chunk_size == 0 {
            return Err(AskblogError::Config(
                "chunking.chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(AskblogError::Config(
                "chunking.chunk_overlap must be less than chunk_size".to_string(),
            ));
        }

        if self.embeddings.dimension == 0 {
            return Err(AskblogError::Config(
                "embeddings.dimension must be greater than 0".to_string(),
            ));
        }

        if self.answer.top_k == 0 {
            return Err(AskblogError::Config(
                "answer.top_k must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.answer.temperature) {
            return Err(AskblogError::Config(
                "answer.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Read the answer-provider API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.answer.api_key_env).map_err(|_| {
            AskblogError::Config(format!(
                "Environment variable {} not set. Set it in your .env file or as an environment variable.",
                self.answer.api_key_env
            ))
        })
    }

    /// Get the cache root directory
    pub fn build_dir(&self) -> &Path {
        &self.cache.build_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.blog.max_pages, 5);
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.embeddings.model, "mxbai-embed-large");
        assert_eq!(config.embeddings.dimension, 1024);
        assert_eq!(config.answer.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_validate_rejects_zero_dimension() {
        let mut config = Config::default();
        config.embeddings.dimension = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_partial_override() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[blog]
start_url = "https://example.com/blog/"
max_pages = 2

[chunking]
chunk_size = 400
chunk_overlap = 40
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.blog.start_url, "https://example.com/blog/");
        assert_eq!(config.blog.max_pages, 2);
        assert_eq!(config.chunking.chunk_size, 400);
        // Untouched sections fall back to defaults
        assert_eq!(config.answer.top_k, 4);
        assert_eq!(config.cache.build_dir, PathBuf::from("context"));
    }

    #[test]
    fn test_validate_rejects_overlap_ge_size() {
        let mut config = Config::default();
        config.chunking.chunk_size = 100;
        config.chunking.chunk_overlap = 100;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AskblogError::Config(_)));
        assert!(err.to_string().contains("chunk_overlap"));

        config.chunking.chunk_overlap = 150;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_max_pages() {
        let mut config = Config::default();
        config.blog.max_pages = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let mut config = Config::default();
        config.answer.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_rejects_malformed_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[blog\nstart_url = ").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, AskblogError::Config(_)));
    }
}
