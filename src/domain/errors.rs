//! Domain error types
//!
//! This module defines the error hierarchy for Shelfport. Pipeline failures are
//! split into two classes: per-item failures that the chunk runner converts into
//! skip records, and job-level failures that end the run. All errors are
//! domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main Shelfport error type
///
/// This is the primary error type used throughout the application.
#[derive(Debug, Error)]
pub enum ShelfportError {
    /// The identifier source is unusable (fatal, the job never starts when
    /// raised before the first chunk)
    #[error("Malformed input at line {line}: {reason}")]
    MalformedInput { line: u64, reason: String },

    /// No entity matched an identifier (skippable)
    #[error("Not found: {0}")]
    NotFound(String),

    /// A declared field could not be extracted from an entity (skippable)
    #[error("Transform error: {0}")]
    Transform(String),

    /// The lookup collaborator failed
    #[error("Upstream error: {message}")]
    Upstream { message: String, retryable: bool },

    /// Too many items were skipped
    #[error("Skip limit exceeded: {skipped} skipped items, limit is {limit}")]
    SkipLimitExceeded { limit: usize, skipped: usize },

    /// Durable or staged storage failed
    #[error("Write error: {0}")]
    Write(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Lookup collaborator errors
    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// Object storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ShelfportError {
    /// Whether the chunk runner may skip the item that raised this error
    /// instead of failing the job
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Transform(_))
    }

    /// Whether a caller's retry policy may re-attempt the operation
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { retryable, .. } => *retryable,
            Self::Lookup(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Lookup collaborator errors
///
/// Errors that occur when querying the external record lookup service.
/// These errors don't expose third-party HTTP client types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The request did not complete in time
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// The service could not be reached or answered with a server error
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The service rejected the request (4xx other than not-found)
    #[error("Request rejected: {status} - {message}")]
    Rejected { status: u16, message: String },

    /// The service answered with a body we cannot read
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl LookupError {
    /// Timeouts and unavailability may clear up on their own
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Unavailable(_))
    }
}

/// Object storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// The object does not exist
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// Uploading an object failed
    #[error("Failed to upload {key}: {message}")]
    UploadFailed { key: String, message: String },

    /// Downloading an object failed
    #[error("Failed to download {key}: {message}")]
    DownloadFailed { key: String, message: String },

    /// Composing several objects into one failed
    #[error("Failed to compose {destination}: {message}")]
    ComposeFailed {
        destination: String,
        message: String,
    },

    /// The object key is not acceptable to the backend
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for ShelfportError {
    fn from(err: std::io::Error) -> Self {
        ShelfportError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for ShelfportError {
    fn from(err: serde_json::Error) -> Self {
        ShelfportError::Serialization(err.to_string())
    }
}

// Conversion from csv::Error
impl From<csv::Error> for ShelfportError {
    fn from(err: csv::Error) -> Self {
        ShelfportError::Serialization(format!("CSV error: {err}"))
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for ShelfportError {
    fn from(err: toml::de::Error) -> Self {
        ShelfportError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shelfport_error_display() {
        let err = ShelfportError::MalformedInput {
            line: 7,
            reason: "expected 1 field, found 2".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed input at line 7: expected 1 field, found 2"
        );
    }

    #[test]
    fn test_skippable_classification() {
        assert!(ShelfportError::NotFound("A".to_string()).is_skippable());
        assert!(ShelfportError::Transform("missing barcode".to_string()).is_skippable());
        assert!(!ShelfportError::Upstream {
            message: "down".to_string(),
            retryable: true
        }
        .is_skippable());
        assert!(!ShelfportError::Write("disk full".to_string()).is_skippable());
        assert!(!ShelfportError::SkipLimitExceeded {
            limit: 0,
            skipped: 1
        }
        .is_skippable());
    }

    #[test]
    fn test_retryable_classification() {
        let err = ShelfportError::Upstream {
            message: "timeout".to_string(),
            retryable: true,
        };
        assert!(err.is_retryable());

        let err: ShelfportError = LookupError::Timeout("30s".to_string()).into();
        assert!(err.is_retryable());

        let err: ShelfportError = LookupError::Rejected {
            status: 400,
            message: "bad query".to_string(),
        }
        .into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_storage_error_conversion() {
        let storage_err = StorageError::ObjectNotFound("jobs/1/1.csv".to_string());
        let err: ShelfportError = storage_err.into();
        assert!(matches!(err, ShelfportError::Storage(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: ShelfportError = io_err.into();
        assert!(matches!(err, ShelfportError::Io(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: ShelfportError = toml_err.into();
        assert!(matches!(err, ShelfportError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_shelfport_error_implements_std_error() {
        let err = ShelfportError::Validation("Test error".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
