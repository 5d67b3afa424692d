//! Local filesystem document source.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StorageError;
use crate::storage_traits::{Document, DocumentSource, NamePattern, ObjectLocation, StorageResult};

/// Reads documents from local disk.
///
/// A file path yields exactly that file, whatever the pattern says. A
/// directory yields every file below it whose file name matches.
#[derive(Debug, Default, Clone)]
pub struct LocalSource;

impl LocalSource {
    pub fn new() -> Self {
        Self
    }

    async fn read_document(path: &Path) -> StorageResult<Document> {
        let bytes = tokio::fs::read(path).await?;
        let uri = path.to_string_lossy().into_owned();
        let content =
            String::from_utf8(bytes).map_err(|_| StorageError::InvalidEncoding { uri: uri.clone() })?;
        Ok(Document::new(uri, content))
    }

    /// Collect matching files below `root`, sorted by path.
    async fn collect_files(
        root: &Path,
        pattern: &NamePattern,
        recursive: bool,
    ) -> StorageResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;

                if file_type.is_dir() {
                    if recursive {
                        pending.push(path);
                    }
                    continue;
                }

                let name = entry.file_name();
                if pattern.is_match(&name.to_string_lossy()) {
                    files.push(path);
                }
            }
        }

        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl DocumentSource for LocalSource {
    async fn exists(&self, uri: &str) -> StorageResult<bool> {
        match tokio::fs::metadata(uri).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn list(
        &self,
        uri: &str,
        pattern: &NamePattern,
        recursive: bool,
    ) -> StorageResult<Vec<Document>> {
        let path = Path::new(uri);
        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::PathNotFound {
                    path: uri.to_string(),
                })
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        if !metadata.is_dir() {
            return Ok(vec![Self::read_document(path).await?]);
        }

        let files = Self::collect_files(path, pattern, recursive).await?;
        debug!(path = %uri, pattern = %pattern.as_str(), matched = files.len(), "Scanned directory");

        let mut documents = Vec::with_capacity(files.len());
        for file in &files {
            documents.push(Self::read_document(file).await?);
        }

        if documents.is_empty() {
            return Err(StorageError::NoFilesMatched {
                path: uri.to_string(),
                pattern: pattern.as_str().to_string(),
            });
        }

        Ok(documents)
    }

    /// Writes `<bucket>/<key>` atomically: temp file in the target
    /// directory, then rename.
    async fn store(&self, location: &ObjectLocation, content: &str) -> StorageResult<()> {
        let target = Path::new(&location.bucket).join(&location.key);
        let content = content.as_bytes().to_vec();

        tokio::task::spawn_blocking(move || -> StorageResult<()> {
            let dir = match target.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            std::fs::create_dir_all(&dir)?;

            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(&content)?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn single_file_ignores_pattern() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "plan.txt", "{}");
        let uri = dir.path().join("plan.txt");

        let docs = LocalSource::new()
            .list(uri.to_str().unwrap(), &NamePattern::json(), true)
            .await
            .unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "{}");
        assert!(docs[0].source_uri.ends_with("plan.txt"));
    }

    #[tokio::test]
    async fn directory_walk_is_recursive_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "master.json", "1");
        write(dir.path(), "infrastructure/vpc.json", "2");
        write(dir.path(), "infrastructure/ecs-cluster.json", "3");
        write(dir.path(), "README.md", "ignored");

        let docs = LocalSource::new()
            .list(dir.path().to_str().unwrap(), &NamePattern::json(), true)
            .await
            .unwrap();

        let contents: Vec<_> = docs.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["3", "2", "1"]);
    }

    #[tokio::test]
    async fn non_recursive_skips_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "top.rego", "package a");
        write(dir.path(), "nested/deep.rego", "package b");

        let docs = LocalSource::new()
            .list(dir.path().to_str().unwrap(), &NamePattern::rego(), false)
            .await
            .unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "package a");
    }

    #[tokio::test]
    async fn missing_path_is_not_found() {
        let err = LocalSource::new()
            .list("does/not/exist/tfplan.json", &NamePattern::json(), true)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("does/not/exist/tfplan.json"));
    }

    #[tokio::test]
    async fn empty_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "notes.txt", "nothing to scan");

        let err = LocalSource::new()
            .list(dir.path().to_str().unwrap(), &NamePattern::json(), true)
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::NoFilesMatched { .. }));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn exists_reports_presence() {
        let dir = tempfile::tempdir().unwrap();
        let source = LocalSource::new();
        assert!(source.exists(dir.path().to_str().unwrap()).await.unwrap());
        assert!(!source
            .exists(dir.path().join("missing").to_str().unwrap())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn store_writes_under_bucket_directory() {
        let dir = tempfile::tempdir().unwrap();
        let location = ObjectLocation::new(dir.path().to_str().unwrap(), "out/result.json");

        LocalSource::new().store(&location, "[]").await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("out/result.json")).unwrap();
        assert_eq!(written, "[]");
    }
}
