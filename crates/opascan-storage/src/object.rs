//! Object storage document source.
//!
//! Backed by any [`ObjectStoreClient`] so the same listing and filtering
//! logic runs against S3 in production and `MemoryObjectStore` in tests.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::StorageError;
use crate::storage_traits::{
    Document, DocumentSource, NamePattern, ObjectLocation, ObjectStoreClient, StorageResult,
};

/// URL scheme handled by [`ObjectStorageSource`].
pub const S3_SCHEME: &str = "s3";

/// Parsed `s3://bucket/prefix` location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Url {
    pub bucket: String,
    pub prefix: String,
}

impl S3Url {
    /// Parse `s3://bucket[/prefix]`. The scheme is matched case-insensitively.
    pub fn parse(url: &str) -> StorageResult<Self> {
        let invalid = || StorageError::InvalidUrl {
            url: url.to_string(),
        };

        let (scheme, rest) = url.split_once("://").ok_or_else(invalid)?;
        if !scheme.eq_ignore_ascii_case(S3_SCHEME) {
            return Err(invalid());
        }

        let (bucket, prefix) = match rest.split_once('/') {
            Some((bucket, prefix)) => (bucket, prefix),
            None => (rest, ""),
        };
        if bucket.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        })
    }

    /// Full URI of an object in this bucket.
    pub fn object_uri(&self, key: &str) -> String {
        format!("{}://{}/{}", S3_SCHEME, self.bucket, key)
    }
}

/// Whether `uri` names an object storage location.
pub fn is_object_uri(uri: &str) -> bool {
    uri.split_once("://")
        .map(|(scheme, _)| scheme.eq_ignore_ascii_case(S3_SCHEME))
        .unwrap_or(false)
}

/// Document source over an object store.
pub struct ObjectStorageSource {
    client: Arc<dyn ObjectStoreClient>,
}

impl ObjectStorageSource {
    pub fn new(client: Arc<dyn ObjectStoreClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentSource for ObjectStorageSource {
    async fn exists(&self, uri: &str) -> StorageResult<bool> {
        let url = S3Url::parse(uri)?;
        let keys = self.client.list_keys(&url.bucket, &url.prefix).await?;
        Ok(!keys.is_empty())
    }

    async fn list(
        &self,
        uri: &str,
        pattern: &NamePattern,
        recursive: bool,
    ) -> StorageResult<Vec<Document>> {
        let url = S3Url::parse(uri)?;
        let keys = self.client.list_keys(&url.bucket, &url.prefix).await?;

        let matched: Vec<String> = keys
            .into_iter()
            .filter(|key| recursive || is_direct_child(&url.prefix, key))
            .filter(|key| pattern.is_match(key))
            .collect();

        debug!(uri = %uri, pattern = %pattern.as_str(), matched = matched.len(), "Listed objects");

        if matched.is_empty() {
            return Err(StorageError::NoObjectsMatched {
                uri: uri.to_string(),
            });
        }

        let mut documents = Vec::with_capacity(matched.len());
        for key in &matched {
            let body = self.client.get_object(&url.bucket, key).await?;
            let source_uri = url.object_uri(key);
            let content = String::from_utf8(body).map_err(|_| StorageError::InvalidEncoding {
                uri: source_uri.clone(),
            })?;
            documents.push(Document::new(source_uri, content));
        }

        Ok(documents)
    }

    async fn store(&self, location: &ObjectLocation, content: &str) -> StorageResult<()> {
        self.client
            .put_object(&location.bucket, &location.key, content.as_bytes().to_vec())
            .await
    }
}

/// A key is a direct child when nothing after the prefix (and an optional
/// separating slash) contains another `/`.
fn is_direct_child(prefix: &str, key: &str) -> bool {
    let rest = key.strip_prefix(prefix).unwrap_or(key);
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    !rest.contains('/')
}
