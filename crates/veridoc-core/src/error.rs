//! Unified error types for Veridoc

use thiserror::Error;

/// Unified error type for all Veridoc operations
#[derive(Error, Debug)]
pub enum VeridocError {
    // Routing errors
    #[error("Unknown institution: {0}")]
    UnknownInstitution(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    // Input-shape errors
    #[error("Format error: {0}")]
    Format(String),

    // Browser/automation errors
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Evidence capture error: {0}")]
    Evidence(String),

    // Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

/// Result type alias using VeridocError
pub type Result<T> = std::result::Result<T, VeridocError>;
