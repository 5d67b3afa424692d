//! Storage trait definitions for opascan
//!
//! These traits define the storage abstractions:
//! - `DocumentSource`: read/list/write of raw text documents
//! - `ObjectStoreClient`: the three object storage calls the S3 adapter needs
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Name pattern for rule modules.
pub const REGO_PATTERN: &str = r"^.+\.(rego)$";

/// Name pattern for input documents.
pub const JSON_PATTERN: &str = r"^.+\.(json)$";

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// A raw text document read from a storage backend.
///
/// Immutable once read. `source_uri` is the full location the content came
/// from (a filesystem path or `s3://bucket/key`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub source_uri: String,
    pub content: String,
    pub dialect_hint: Option<String>,
}

impl Document {
    pub fn new(source_uri: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source_uri: source_uri.into(),
            content: content.into(),
            dialect_hint: None,
        }
    }

    /// Attach a dialect hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.dialect_hint = Some(hint.into());
        self
    }
}

/// Compiled file/object name filter.
#[derive(Debug, Clone)]
pub struct NamePattern(Regex);

impl NamePattern {
    /// Compile a pattern, rejecting invalid regular expressions.
    pub fn new(pattern: &str) -> StorageResult<Self> {
        Regex::new(pattern)
            .map(NamePattern)
            .map_err(|e| StorageError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    /// Pattern matching `*.rego` rule modules.
    pub fn rego() -> Self {
        NamePattern(Regex::new(REGO_PATTERN).expect("static pattern compiles"))
    }

    /// Pattern matching `*.json` input documents.
    pub fn json() -> Self {
        NamePattern(Regex::new(JSON_PATTERN).expect("static pattern compiles"))
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.0.is_match(name)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Destination of a `store` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

// ---------------------------------------------------------------------------
// DocumentSource
// ---------------------------------------------------------------------------

/// Uniform access to documents on a storage backend.
///
/// Guarantees:
/// - `list` never returns an empty vector; "nothing there" is a
///   `StorageError` for which `is_not_found()` holds.
/// - Returned documents are ordered deterministically (by location).
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Whether anything exists at `uri`.
    async fn exists(&self, uri: &str) -> StorageResult<bool>;

    /// Read every document under `uri` whose name matches `pattern`.
    async fn list(
        &self,
        uri: &str,
        pattern: &NamePattern,
        recursive: bool,
    ) -> StorageResult<Vec<Document>>;

    /// Write `content` to `location`.
    async fn store(&self, location: &ObjectLocation, content: &str) -> StorageResult<()>;
}

// ---------------------------------------------------------------------------
// ObjectStoreClient
// ---------------------------------------------------------------------------

/// Minimal object storage API consumed by [`crate::ObjectStorageSource`].
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    /// List every key in `bucket` starting with `prefix`, in key order.
    async fn list_keys(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>>;

    /// Fetch the body of one object.
    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    /// Create or replace one object.
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<()>;
}
