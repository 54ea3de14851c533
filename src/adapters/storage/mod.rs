//! Durable object storage
//!
//! Published outputs, error reports and outcome documents are written through
//! the [`ObjectStorage`] trait. Keys are `/`-separated relative paths such as
//! `exports/job-1/job-1.csv`.

pub mod checksum;
pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

pub use checksum::{sha256_bytes, sha256_file};
pub use local::LocalObjectStorage;
#[cfg(feature = "s3")]
pub use s3::S3ObjectStorage;

use crate::domain::{Result, StorageError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Key-addressed blob store
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload a local file
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<()>;

    /// Upload an in-memory buffer
    async fn put_bytes(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Download an object
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Concatenate `sources`, in order, into `destination`
    async fn compose(&self, destination: &str, sources: &[String], content_type: &str)
        -> Result<()>;
}

/// An object written by a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedObject {
    pub key: String,

    /// Encoding name (`csv`, `json`) or `errors` for the skip report
    pub format: String,

    /// Size in bytes
    pub size: u64,

    /// Hex-encoded SHA-256 of the object contents
    pub sha256: String,
}

/// Reject keys that could escape a storage root or address nothing
pub fn validate_key(key: &str) -> std::result::Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key cannot be empty".to_string()));
    }
    if key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "'{key}' must be a relative, '/'-separated path"
        )));
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::InvalidKey(format!(
            "'{key}' contains an empty or relative segment"
        )));
    }
    Ok(())
}

/// Join key segments, ignoring empty ones and stray slashes
pub fn join_key(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("exports/job-1/job-1.csv", true)]
    #[test_case("job-1.json", true)]
    #[test_case("", false)]
    #[test_case("/abs/key", false)]
    #[test_case("a//b", false)]
    #[test_case("a/../b", false)]
    #[test_case("a\\b", false)]
    fn test_validate_key(key: &str, valid: bool) {
        assert_eq!(validate_key(key).is_ok(), valid);
    }

    #[test]
    fn test_join_key() {
        assert_eq!(join_key(&["exports/", "job-1", "job-1.csv"]), "exports/job-1/job-1.csv");
        assert_eq!(join_key(&["", "job-1", "outcome.json"]), "job-1/outcome.json");
    }
}
