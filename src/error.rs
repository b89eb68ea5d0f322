//! Error handling utilities shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Convenient result type used throughout the crate.
pub type Result<T, E = SbpeError> = std::result::Result<T, E>;

/// Domain-specific error describing failures during training, persistence, or validation.
#[derive(Debug, Error)]
pub enum SbpeError {
    /// A caller-supplied argument violated a precondition (e.g. vocab size below 256).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The segmentation pattern failed to compile.
    #[error("invalid segmentation pattern: {0}")]
    InvalidPattern(String),
    /// The regex engine failed while splitting text (e.g. backtracking limit exceeded).
    #[error("segmentation failed: {0}")]
    Segmentation(String),
    /// One or more samples did not survive an encode/decode round trip.
    #[error("tokenizer validation failed on {} sample(s)", failures.len())]
    ValidationFailure {
        /// Samples whose round trip did not reproduce the input.
        failures: Vec<String>,
    },
    /// A model load was requested but no persisted artefact exists.
    #[error("no tokenizer model found at {0:?}")]
    MissingModel(PathBuf),
    /// A persisted model violates the schema or the vocabulary invariants.
    #[error("invalid tokenizer model: {0}")]
    InvalidModel(String),
    /// Filesystem IO error with optional context path.
    #[error("io error while processing {path:?}: {source}")]
    Io {
        /// Underlying IO error returned by the standard library.
        source: std::io::Error,
        /// Target path associated with the IO failure if available.
        path: Option<PathBuf>,
    },
    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Catch-all variant for invariants that should not occur.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for SbpeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl SbpeError {
    /// Helper constructor that attaches an optional path when wrapping IO errors.
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }
}
