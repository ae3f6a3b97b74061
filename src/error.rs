use thiserror::Error;

/// Main error type for askblog
#[derive(Error, Debug)]
pub enum AskblogError {
    /// Network fetch failures
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected page or document structure
    #[error("Parse error: {0}")]
    Parse(String),

    /// Corrupt or unreadable persisted artifact
    #[error("Cache error: {0}")]
    Cache(String),

    /// Embedding or answer-generation service failures
    #[error("Provider error: {0}")]
    Provider(String),
}

/// Convenient Result type using AskblogError
pub type Result<T> = std::result::Result<T, AskblogError>;
