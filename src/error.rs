//! Error types shared across the quiz engine and its collaborators

/// Result type for core quiz operations
pub type QuizResult<T> = Result<T, QuizError>;

/// Errors raised by the timing and selection core
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum QuizError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// No eligible index was left to draw. Creation-time validation makes this
    /// unreachable, so seeing it means the configuration slipped through.
    #[error("Question pool exhausted: all {pool_size} questions are on cooldown")]
    ExhaustedPool { pool_size: usize },
}

/// Errors that can occur while loading configuration files
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Invalid(#[from] QuizError),
}

/// Errors from the score store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Score file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Score file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors from the chat transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server closed the connection")]
    Closed,
}
