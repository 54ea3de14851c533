//! Filesystem-backed object storage
//!
//! Objects are files under a root directory. Writes go to a temporary sibling
//! first and are renamed into place, so a reader never sees half an object.

use super::{validate_key, ObjectStorage};
use crate::domain::{Result, ShelfportError, StorageError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Object storage rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    root: PathBuf,
}

impl LocalObjectStorage {
    /// Use `root` as the storage root, creating it if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            ShelfportError::Configuration(format!(
                "Failed to create storage root {}: {e}",
                root.display()
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of an object
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    async fn prepare(&self, key: &str) -> Result<(PathBuf, PathBuf)> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| upload_failed(key, e))?;
        }
        let mut tmp = path.clone().into_os_string();
        tmp.push(".partial");
        Ok((path, PathBuf::from(tmp)))
    }
}

fn upload_failed(key: &str, e: impl std::fmt::Display) -> ShelfportError {
    StorageError::UploadFailed {
        key: key.to_string(),
        message: e.to_string(),
    }
    .into()
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn put_file(&self, key: &str, path: &Path, _content_type: &str) -> Result<()> {
        let (dest, tmp) = self.prepare(key).await?;
        tokio::fs::copy(path, &tmp)
            .await
            .map_err(|e| upload_failed(key, e))?;
        tokio::fs::rename(&tmp, &dest)
            .await
            .map_err(|e| upload_failed(key, e))?;
        tracing::debug!(key = %key, source = %path.display(), "Stored object from file");
        Ok(())
    }

    async fn put_bytes(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        let (dest, tmp) = self.prepare(key).await?;
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| upload_failed(key, e))?;
        tokio::fs::rename(&tmp, &dest)
            .await
            .map_err(|e| upload_failed(key, e))?;
        tracing::debug!(key = %key, size = bytes.len(), "Stored object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::ObjectNotFound(key.to_string()).into())
            }
            Err(e) => Err(StorageError::DownloadFailed {
                key: key.to_string(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        tokio::fs::try_exists(&path).await.map_err(|e| {
            StorageError::DownloadFailed {
                key: key.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    async fn compose(
        &self,
        destination: &str,
        sources: &[String],
        _content_type: &str,
    ) -> Result<()> {
        let (dest, tmp) = self.prepare(destination).await?;
        let compose_failed = |message: String| -> ShelfportError {
            StorageError::ComposeFailed {
                destination: destination.to_string(),
                message,
            }
            .into()
        };

        let mut out = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| compose_failed(e.to_string()))?;
        for source in sources {
            let mut input = tokio::fs::File::open(self.path_for(source)?)
                .await
                .map_err(|e| compose_failed(format!("{source}: {e}")))?;
            tokio::io::copy(&mut input, &mut out)
                .await
                .map_err(|e| compose_failed(format!("{source}: {e}")))?;
        }
        out.flush().await.map_err(|e| compose_failed(e.to_string()))?;
        out.sync_all()
            .await
            .map_err(|e| compose_failed(e.to_string()))?;
        drop(out);

        tokio::fs::rename(&tmp, &dest)
            .await
            .map_err(|e| compose_failed(e.to_string()))?;
        tracing::debug!(destination = %destination, parts = sources.len(), "Composed object");
        Ok(())
    }
}
