//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryObjectStore`, an `ObjectStoreClient` backed by a
//! `BTreeMap<(bucket, key), bytes>` so listings come back in key order like S3.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::storage_traits::*;

/// In-memory object store.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object, builder style.
    pub fn with_object(self, bucket: &str, key: &str, body: &str) -> Self {
        self.insert(bucket, key, body);
        self
    }

    pub fn insert(&self, bucket: &str, key: &str, body: &str) {
        let mut objects = self.objects.lock().unwrap();
        objects.insert((bucket.to_string(), key.to_string()), body.as_bytes().to_vec());
    }

    /// Read an object back as text.
    pub fn object(&self, bucket: &str, key: &str) -> Option<String> {
        let objects = self.objects.lock().unwrap();
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|body| String::from_utf8_lossy(body).into_owned())
    }
}

#[async_trait]
impl ObjectStoreClient for MemoryObjectStore {
    async fn list_keys(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let objects = self.objects.lock().unwrap();
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::Transport(format!("NoSuchKey: {}/{}", bucket, key)))
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<()> {
        let mut objects = self.objects.lock().unwrap();
        objects.insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }
}
