//! Error types for opascan-storage

use thiserror::Error;

/// Errors raised by document sources.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Local path does not exist
    #[error("Input file {path} does not exist.")]
    PathNotFound { path: String },

    /// Local directory exists but no file matched the name pattern
    #[error("No files matching {pattern} under {path}")]
    NoFilesMatched { path: String, pattern: String },

    /// Object storage prefix exists but no object matched the name pattern
    #[error("S3 object {uri} does not exist.")]
    NoObjectsMatched { uri: String },

    /// URL could not be interpreted as an object storage location
    #[error("Url {url} is not valid S3 url.")]
    InvalidUrl { url: String },

    /// Name pattern is not a valid regular expression
    #[error("Invalid name pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// URI routed to a backend that was not configured for this process
    #[error("No storage backend configured for {uri}")]
    BackendUnavailable { uri: String },

    /// Object storage request failed
    #[error("Object storage request failed: {0}")]
    Transport(String),

    /// Document bytes are not valid UTF-8
    #[error("Document {uri} is not valid UTF-8")]
    InvalidEncoding { uri: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether this error means "nothing to read" rather than a transport failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::PathNotFound { .. }
                | StorageError::NoFilesMatched { .. }
                | StorageError::NoObjectsMatched { .. }
        )
    }
}
