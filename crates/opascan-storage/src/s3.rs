//! S3 implementation of [`ObjectStoreClient`].

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::debug;

use crate::error::StorageError;
use crate::storage_traits::{ObjectStoreClient, StorageResult};

/// Thin wrapper around an `aws_sdk_s3::Client`.
///
/// Build it once per process and share it; the SDK client is cheap to clone
/// and safe to use concurrently.
#[derive(Debug, Clone)]
pub struct S3Client {
    client: Client,
}

impl S3Client {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS provider chain
    /// (environment, profile, instance metadata).
    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(Client::new(&config))
    }
}

fn transport<E: std::error::Error>(err: E) -> StorageError {
    StorageError::Transport(DisplayErrorContext(err).to_string())
}

#[async_trait]
impl ObjectStoreClient for S3Client {
    async fn list_keys(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(transport)?;

            keys.extend(
                resp.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            match resp.next_continuation_token() {
                Some(token) if resp.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        debug!(bucket = %bucket, prefix = %prefix, keys = keys.len(), "Listed S3 prefix");
        Ok(keys)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(transport)?;

        let body = resp.body.collect().await.map_err(transport)?;
        Ok(body.into_bytes().to_vec())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_disposition("attachment")
            .send()
            .await
            .map_err(transport)?;
        Ok(())
    }
}
