//! Error types for the Glossa library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`GlossaError`] enum. Lookups never fail on a plain miss: a word that is not
//! in the vocabulary is `None`, not an error.
//!
//! # Examples
//!
//! ```
//! use glossa::error::{GlossaError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(GlossaError::invalid_argument("empty source id"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Glossa operations.
#[derive(Error, Debug)]
pub enum GlossaError {
    /// I/O errors (vocabulary files, document directories).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Morphological analysis errors.
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Morphological backend errors (loading, tokenizing).
    #[error("Backend error: {0}")]
    Backend(String),

    /// Morphology index errors.
    #[error("Index error: {0}")]
    Index(String),

    /// Vocabulary store errors.
    #[error("Vocabulary error: {0}")]
    Vocabulary(String),

    /// Vocabulary source collaborator errors (load, write-back).
    #[error("Source error: {0}")]
    Source(String),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with GlossaError.
pub type Result<T> = std::result::Result<T, GlossaError>;

impl GlossaError {
    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        GlossaError::Analysis(msg.into())
    }

    /// Create a new backend error.
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        GlossaError::Backend(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        GlossaError::Index(msg.into())
    }

    /// Create a new vocabulary error.
    pub fn vocabulary<S: Into<String>>(msg: S) -> Self {
        GlossaError::Vocabulary(msg.into())
    }

    /// Create a new source error.
    pub fn source<S: Into<String>>(msg: S) -> Self {
        GlossaError::Source(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        GlossaError::Config(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        GlossaError::Other(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        GlossaError::Other(format!("Invalid argument: {}", msg.into()))
    }

    /// Create a new internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        GlossaError::Other(format!("Internal error: {}", msg.into()))
    }

    /// Create a new not found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        GlossaError::Other(format!("Not found: {}", msg.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = GlossaError::analysis("bad token");
        assert_eq!(error.to_string(), "Analysis error: bad token");

        let error = GlossaError::backend("model missing");
        assert_eq!(error.to_string(), "Backend error: model missing");

        let error = GlossaError::invalid_argument("empty id");
        assert_eq!(error.to_string(), "Error: Invalid argument: empty id");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let glossa_error = GlossaError::from(io_error);

        match glossa_error {
            GlossaError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }
}
