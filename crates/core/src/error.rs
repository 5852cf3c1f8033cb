//! Error types for the surge-map system.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the surge-map system.
///
/// Degenerate datasets and numeric edge cases are not errors; the pipeline
/// answers those with empty results or identity fallbacks.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Hex indexer rejected a coordinate, resolution or cell key.
    #[error("Hex index error: {0}")]
    HexIndex(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a hex index error.
    pub fn hex_index(msg: impl Into<String>) -> Self {
        Error::HexIndex(msg.into())
    }
}
