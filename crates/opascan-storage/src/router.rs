//! Routes a URI to the document source that can serve it.

use std::sync::Arc;

use crate::error::StorageError;
use crate::local::LocalSource;
use crate::object::{is_object_uri, ObjectStorageSource};
use crate::storage_traits::{DocumentSource, ObjectStoreClient, StorageResult};

/// Backend selected for a URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Local,
    ObjectStorage,
}

impl SourceKind {
    /// Sniff the backend from the URI scheme. Anything that is not `s3://`
    /// is treated as a filesystem path.
    pub fn from_uri(uri: &str) -> Self {
        if is_object_uri(uri) {
            SourceKind::ObjectStorage
        } else {
            SourceKind::Local
        }
    }
}

/// Process-wide set of document sources.
///
/// Built once at startup and shared read-only; rule paths and the input path
/// are routed independently so they may live on different backends.
#[derive(Clone)]
pub struct SourceRouter {
    local: Arc<LocalSource>,
    object: Option<Arc<ObjectStorageSource>>,
}

impl SourceRouter {
    /// Router that can only read local paths.
    pub fn local_only() -> Self {
        Self {
            local: Arc::new(LocalSource::new()),
            object: None,
        }
    }

    /// Router with both backends.
    pub fn new(object_client: Arc<dyn ObjectStoreClient>) -> Self {
        Self {
            local: Arc::new(LocalSource::new()),
            object: Some(Arc::new(ObjectStorageSource::new(object_client))),
        }
    }

    /// Source responsible for `uri`.
    pub fn for_uri(&self, uri: &str) -> StorageResult<&dyn DocumentSource> {
        match SourceKind::from_uri(uri) {
            SourceKind::Local => Ok(self.local.as_ref()),
            SourceKind::ObjectStorage => self
                .object
                .as_deref()
                .map(|source| source as &dyn DocumentSource)
                .ok_or_else(|| StorageError::BackendUnavailable {
                    uri: uri.to_string(),
                }),
        }
    }

    /// Object storage source, if configured.
    pub fn object_storage(&self) -> StorageResult<&dyn DocumentSource> {
        self.object
            .as_deref()
            .map(|source| source as &dyn DocumentSource)
            .ok_or_else(|| StorageError::BackendUnavailable {
                uri: "s3://".to_string(),
            })
    }

    /// Local filesystem source.
    pub fn local(&self) -> &dyn DocumentSource {
        self.local.as_ref()
    }
}
