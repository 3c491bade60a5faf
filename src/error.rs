//! Error types for quiver-db operations.
//!
//! Every fallible public operation returns [`Result`]. Variants group into
//! the failure categories surfaced at the request boundary: not-found,
//! conflict, bad request, invalid filter, corrupt file, I/O, internal.

use std::io;
use thiserror::Error;

use crate::types::DocId;

/// Result type alias using [`QuiverDbError`].
pub type Result<T> = std::result::Result<T, QuiverDbError>;

/// Errors that can occur during quiver-db operations.
#[derive(Error, Debug)]
pub enum QuiverDbError {
    /// No index with the given name is currently loaded.
    #[error("index not found: {0}")]
    IndexNotFound(String),

    /// No document with the given id exists in the index.
    #[error("document not found: id {0}")]
    DocumentNotFound(DocId),

    /// An index with the given name already exists in memory.
    #[error("index already exists: {0}")]
    IndexAlreadyExists(String),

    /// The operation requires the index to be unloaded first.
    #[error("index is loaded: {0} (delete it from memory first)")]
    IndexLoaded(String),

    /// Malformed request input (length mismatches, bad parameters).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Filter string failed tokenization or parsing, or used an
    /// unsupported comparator.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Vector dimensions do not match the index dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected vector dimension.
        expected: usize,
        /// Actual vector dimension provided.
        actual: usize,
    },

    /// A persisted file has an invalid or unrecognized layout.
    #[error("corrupt format: {0}")]
    CorruptFormat(String),

    /// Checksum verification failed during file loading.
    #[error("checksum mismatch: file may be corrupted")]
    ChecksumMismatch,

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invariant violation inside the engine.
    #[error("internal error: {0}")]
    Internal(String),
}

impl QuiverDbError {
    /// Creates a new `IndexNotFound` error.
    pub fn index_not_found(name: impl Into<String>) -> Self {
        Self::IndexNotFound(name.into())
    }

    /// Creates a new `BadRequest` error.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Creates a new `InvalidFilter` error.
    pub fn invalid_filter(msg: impl Into<String>) -> Self {
        Self::InvalidFilter(msg.into())
    }

    /// Creates a new `DimensionMismatch` error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Creates a new `CorruptFormat` error.
    pub fn corrupt_format(msg: impl Into<String>) -> Self {
        Self::CorruptFormat(msg.into())
    }

    /// Creates a new `Internal` error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<bincode::Error> for QuiverDbError {
    fn from(err: bincode::Error) -> Self {
        Self::CorruptFormat(err.to_string())
    }
}

impl From<serde_json::Error> for QuiverDbError {
    fn from(err: serde_json::Error) -> Self {
        Self::CorruptFormat(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QuiverDbError::index_not_found("products");
        assert_eq!(err.to_string(), "index not found: products");

        let err = QuiverDbError::DocumentNotFound(42);
        assert_eq!(err.to_string(), "document not found: id 42");

        let err = QuiverDbError::dimension_mismatch(128, 256);
        assert_eq!(err.to_string(), "dimension mismatch: expected 128, got 256");

        let err = QuiverDbError::ChecksumMismatch;
        assert_eq!(err.to_string(), "checksum mismatch: file may be corrupted");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: QuiverDbError = io_err.into();
        assert!(matches!(err, QuiverDbError::Io(_)));
    }
}
