//! Centralized error types for flowgate

use thiserror::Error;

/// Engine error types
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file parsing or validation failed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Constructing a pipeline worker failed
    #[error("Spawn error: {0}")]
    Spawn(String),

    /// A worker's run loop returned a fatal error
    #[error("Worker error: {0}")]
    Worker(String),

    /// A pipeline name was not found in the model
    #[error("Unknown pipeline: {0}")]
    UnknownPipeline(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, EngineError>;
