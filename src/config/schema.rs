//! Configuration schema types
//!
//! This module defines the configuration structure for Shelfport. Every section
//! except `[job]` and `[lookup]` has defaults.

use crate::config::SecretString;
use crate::core::resolve::{profile_for, RetryPolicy};
use crate::core::runner::ChunkConfig;
use crate::core::source::InputSchema;
use crate::core::transform::{FieldSpec, FilterRule, OutputFormat};
use crate::domain::{EntityKind, IdentifierType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Main Shelfport configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShelfportConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// What to export and how to chunk it
    pub job: JobConfig,

    /// Layout of uploaded identifier files
    #[serde(default)]
    pub input: InputSchema,

    /// Lookup collaborator
    pub lookup: LookupConfig,

    /// Where published objects go
    #[serde(default)]
    pub storage: StorageConfig,

    /// Where job outcomes are reported
    #[serde(default)]
    pub notification: NotificationConfig,

    /// Column declarations and filters
    #[serde(default)]
    pub transform: TransformConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ShelfportConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.job.validate()?;
        self.input.validate()?;
        self.lookup.validate()?;
        self.storage.validate()?;
        self.notification.validate()?;
        self.transform.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Job settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Kind of record to export
    pub entity_kind: EntityKind,

    /// Type of the identifiers in uploaded files
    pub identifier_type: IdentifierType,

    /// Identifiers per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Skipped identifiers tolerated before the job fails
    #[serde(default = "default_skip_limit")]
    pub skip_limit: usize,

    /// Resolve each chunk with one batch lookup before per-item resolution
    #[serde(default)]
    pub prefetch: bool,

    /// Output formats, each published as its own object
    #[serde(default = "default_formats")]
    pub formats: Vec<OutputFormat>,

    /// Number of concurrent segments the input is split into
    #[serde(default = "default_segments")]
    pub segments: usize,
}

impl JobConfig {
    /// Runner settings derived from this section
    pub fn chunk_config(&self) -> ChunkConfig {
        ChunkConfig {
            chunk_size: self.chunk_size,
            skip_limit: self.skip_limit,
            prefetch: self.prefetch,
        }
    }

    fn validate(&self) -> Result<(), String> {
        self.chunk_config().validate()?;

        let profile = profile_for(self.entity_kind);
        if profile.query_field(self.identifier_type).is_none() {
            let supported: Vec<&str> = profile
                .supported_identifiers()
                .iter()
                .map(|t| t.as_str())
                .collect();
            return Err(format!(
                "job.identifier_type '{}' is not supported for {} records. Supported: {}",
                self.identifier_type.as_str(),
                self.entity_kind,
                supported.join(", ")
            ));
        }

        if self.formats.is_empty() {
            return Err("job.formats cannot be empty".to_string());
        }

        if self.segments == 0 || self.segments > 64 {
            return Err(format!(
                "job.segments must be between 1 and 64, got {}",
                self.segments
            ));
        }

        Ok(())
    }
}

/// Lookup backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LookupBackend {
    /// REST lookup service queried with CQL
    #[default]
    Http,
    /// JSON fixtures loaded into memory
    Memory,
}

/// Lookup collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default)]
    pub backend: LookupBackend,

    /// Base URL of the lookup service (http backend)
    #[serde(default)]
    pub base_url: String,

    /// Tenant sent with every request (http backend)
    #[serde(default)]
    pub tenant: Option<String>,

    /// Username for basic authentication (optional)
    #[serde(default)]
    pub username: Option<String>,

    /// Password for basic authentication (optional)
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Pre-issued access token, sent instead of basic credentials (optional)
    #[serde(default)]
    pub token: Option<SecretString>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Maximum records requested per query
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,

    /// Fixture file (memory backend)
    #[serde(default)]
    pub fixtures_path: Option<String>,

    /// Retry policy for upstream failures
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl LookupConfig {
    fn validate(&self) -> Result<(), String> {
        match self.backend {
            LookupBackend::Http => {
                if self.base_url.is_empty() {
                    return Err("lookup.base_url cannot be empty for the http backend".to_string());
                }
                let url = url::Url::parse(&self.base_url)
                    .map_err(|e| format!("lookup.base_url '{}' is invalid: {e}", self.base_url))?;
                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(format!(
                        "lookup.base_url must use http or https, got '{}'",
                        url.scheme()
                    ));
                }
                if self.tenant.as_deref().unwrap_or("").is_empty() {
                    return Err("lookup.tenant is required for the http backend".to_string());
                }
                if self.username.is_some() != self.password.is_some() {
                    return Err(
                        "lookup.username and lookup.password must be set together".to_string()
                    );
                }
            }
            LookupBackend::Memory => {
                if self.fixtures_path.is_none() {
                    return Err(
                        "lookup.fixtures_path is required for the memory backend".to_string()
                    );
                }
            }
        }

        if self.timeout_seconds == 0 || self.timeout_seconds > 600 {
            return Err(format!(
                "lookup.timeout_seconds must be between 1 and 600, got {}",
                self.timeout_seconds
            ));
        }

        if self.page_limit == 0 {
            return Err("lookup.page_limit must be > 0".to_string());
        }

        self.retry.validate()
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Directory on the local filesystem
    #[default]
    Local,
    /// S3-compatible bucket (requires the `s3` feature)
    S3,
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Root directory (local backend)
    #[serde(default = "default_storage_root")]
    pub root: String,

    /// Key prefix for every published object
    #[serde(default = "default_storage_prefix")]
    pub prefix: String,

    /// Directory for staged files before publication
    #[serde(default = "default_staging_dir")]
    pub staging_dir: String,

    /// Bucket name (s3 backend)
    #[serde(default)]
    pub bucket: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    /// Custom endpoint, e.g. a MinIO server
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub access_key: Option<String>,

    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub secret_key: Option<SecretString>,

    /// Path-style addressing, needed by most MinIO deployments
    #[serde(default)]
    pub force_path_style: bool,
}

impl StorageConfig {
    fn validate(&self) -> Result<(), String> {
        if self.staging_dir.is_empty() {
            return Err("storage.staging_dir cannot be empty".to_string());
        }
        if self.prefix.starts_with('/') || self.prefix.split('/').any(|s| s == "..") {
            return Err(format!(
                "storage.prefix '{}' must be relative and must not contain '..'",
                self.prefix
            ));
        }

        match self.backend {
            StorageBackend::Local => {
                if self.root.is_empty() {
                    return Err("storage.root cannot be empty for the local backend".to_string());
                }
            }
            StorageBackend::S3 => {
                if self.bucket.as_deref().unwrap_or("").is_empty() {
                    return Err("storage.bucket is required for the s3 backend".to_string());
                }
                if self.access_key.is_some() != self.secret_key.is_some() {
                    return Err(
                        "storage.access_key and storage.secret_key must be set together"
                            .to_string(),
                    );
                }
                if let Some(endpoint) = &self.endpoint {
                    url::Url::parse(endpoint)
                        .map_err(|e| format!("storage.endpoint '{endpoint}' is invalid: {e}"))?;
                }
            }
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            root: default_storage_root(),
            prefix: default_storage_prefix(),
            staging_dir: default_staging_dir(),
            bucket: None,
            region: None,
            endpoint: None,
            access_key: None,
            secret_key: None,
            force_path_style: false,
        }
    }
}

/// Outcome notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Emit the outcome as a log event
    #[serde(default = "default_true")]
    pub log: bool,

    /// Write `outcome.json` next to the published objects
    #[serde(default = "default_true")]
    pub storage: bool,

    /// POST the outcome to this URL (optional)
    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default = "default_webhook_timeout_seconds")]
    pub webhook_timeout_seconds: u64,
}

impl NotificationConfig {
    fn validate(&self) -> Result<(), String> {
        if let Some(webhook_url) = &self.webhook_url {
            url::Url::parse(webhook_url).map_err(|e| {
                format!("notification.webhook_url '{webhook_url}' is invalid: {e}")
            })?;
        }
        if self.webhook_timeout_seconds == 0 {
            return Err("notification.webhook_timeout_seconds must be > 0".to_string());
        }
        Ok(())
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            log: true,
            storage: true,
            webhook_url: None,
            webhook_timeout_seconds: default_webhook_timeout_seconds(),
        }
    }
}

/// Column declarations and filter rules
///
/// With no `fields`, the entity kind's default columns are exported.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default)]
    pub fields: Vec<FieldSpec>,

    /// All rules must match for an entity to be exported
    #[serde(default)]
    pub filters: Vec<FilterRule>,
}

impl TransformConfig {
    fn validate(&self) -> Result<(), String> {
        let mut headers = HashSet::new();
        for field in &self.fields {
            field.validate()?;
            if !headers.insert(field.header.as_str()) {
                return Err(format!(
                    "transform.fields declares header '{}' more than once",
                    field.header
                ));
            }
        }
        for filter in &self.filters {
            filter.validate()?;
        }
        Ok(())
    }

    /// Declared fields, or the profile defaults when none are declared
    pub fn fields_for(&self, kind: EntityKind) -> Vec<FieldSpec> {
        if self.fields.is_empty() {
            profile_for(kind).default_fields()
        } else {
            self.fields.clone()
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.is_empty() {
            return Err("logging.local_path cannot be empty when local logging is on".to_string());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    ChunkConfig::default().chunk_size
}

fn default_skip_limit() -> usize {
    ChunkConfig::default().skip_limit
}

fn default_formats() -> Vec<OutputFormat> {
    vec![OutputFormat::Csv]
}

fn default_segments() -> usize {
    1
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_page_limit() -> usize {
    100
}

fn default_storage_root() -> String {
    "./exports".to_string()
}

fn default_storage_prefix() -> String {
    "exports".to_string()
}

fn default_staging_dir() -> String {
    "./staging".to_string()
}

fn default_webhook_timeout_seconds() -> u64 {
    10
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    fn job() -> JobConfig {
        JobConfig {
            entity_kind: EntityKind::Item,
            identifier_type: IdentifierType::Barcode,
            chunk_size: 100,
            skip_limit: 10,
            prefetch: false,
            formats: vec![OutputFormat::Csv],
            segments: 1,
        }
    }

    fn http_lookup() -> LookupConfig {
        LookupConfig {
            backend: LookupBackend::Http,
            base_url: "https://okapi.example.org".to_string(),
            tenant: Some("diku".to_string()),
            username: None,
            password: None,
            token: None,
            timeout_seconds: 30,
            page_limit: 100,
            fixtures_path: None,
            retry: RetryPolicy::default(),
        }
    }

    #[test]
    fn test_application_config_validation() {
        let mut config = ApplicationConfig::default();
        assert!(config.validate().is_ok());

        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_job_config_validation() {
        let mut config = job();
        assert!(config.validate().is_ok());

        config.chunk_size = 0;
        assert!(config.validate().is_err());

        config = job();
        config.formats.clear();
        assert!(config.validate().is_err());

        config = job();
        config.segments = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_job_rejects_unsupported_identifier_type() {
        let mut config = job();
        config.entity_kind = EntityKind::User;
        config.identifier_type = IdentifierType::Hrid;
        let err = config.validate().unwrap_err();
        assert!(err.contains("not supported for user records"));
        assert!(err.contains("barcode"));
    }

    #[test]
    fn test_lookup_config_validation() {
        let mut config = http_lookup();
        assert!(config.validate().is_ok());

        config.base_url = "ftp://okapi.example.org".to_string();
        assert!(config.validate().is_err());

        config = http_lookup();
        config.tenant = None;
        assert!(config.validate().is_err());

        config = http_lookup();
        config.username = Some("admin".to_string());
        assert!(config.validate().is_err());
        config.password = Some(secret_string("admin".to_string()));
        assert!(config.validate().is_ok());

        config = http_lookup();
        config.backend = LookupBackend::Memory;
        assert!(config.validate().is_err());
        config.fixtures_path = Some("fixtures.json".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_storage_config_validation() {
        let mut config = StorageConfig::default();
        assert!(config.validate().is_ok());

        config.prefix = "../escape".to_string();
        assert!(config.validate().is_err());

        config = StorageConfig {
            backend: StorageBackend::S3,
            ..StorageConfig::default()
        };
        assert!(config.validate().is_err());
        config.bucket = Some("exports".to_string());
        assert!(config.validate().is_ok());
        config.access_key = Some("minio".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_transform_rejects_duplicate_headers() {
        let config = TransformConfig {
            fields: vec![
                FieldSpec::new("Barcode", "barcode"),
                FieldSpec::new("Barcode", "hrid"),
            ],
            filters: vec![],
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_transform_falls_back_to_profile_fields() {
        let config = TransformConfig::default();
        let fields = config.fields_for(EntityKind::User);
        assert!(!fields.is_empty());

        let config = TransformConfig {
            fields: vec![FieldSpec::new("Barcode", "barcode")],
            filters: vec![],
        };
        assert_eq!(config.fields_for(EntityKind::User).len(), 1);
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(config.local_enabled);
        assert_eq!(config.local_path, "./logs");
        assert_eq!(config.local_rotation, "daily");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_notification_config_validation() {
        let mut config = NotificationConfig::default();
        assert!(config.log && config.storage);
        assert!(config.validate().is_ok());

        config.webhook_url = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_chunk_size(), 100);
        assert_eq!(default_skip_limit(), 1_000_000);
        assert_eq!(default_formats(), vec![OutputFormat::Csv]);
        assert_eq!(default_timeout_seconds(), 30);
        assert_eq!(default_storage_prefix(), "exports");
    }
}
