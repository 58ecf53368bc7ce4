//! Error types for TIN-X

use thiserror::Error;

/// Result type alias for TIN-X operations
pub type Result<T> = std::result::Result<T, TinxError>;

/// Main error type for TIN-X
#[derive(Error, Debug)]
pub enum TinxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Delimited file error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// The protein resolution backend failed (after any retries)
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Neither mentions file produced a single usable entity
    #[error("No usable input: {0}")]
    NoUsableInput(String),

    #[error("Run cancelled")]
    Cancelled,

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl TinxError {
    pub fn config(msg: impl Into<String>) -> Self {
        TinxError::Config(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        TinxError::Parse(msg.into())
    }

    pub fn lookup(msg: impl Into<String>) -> Self {
        TinxError::Lookup(msg.into())
    }
}
