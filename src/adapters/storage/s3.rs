//! S3-compatible object storage (AWS S3, MinIO)

use super::{validate_key, ObjectStorage};
use crate::config::StorageConfig;
use crate::domain::{Result, ShelfportError, StorageError};
use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use secrecy::ExposeSecret;
use std::path::Path;

/// Object storage in one bucket
#[derive(Debug, Clone)]
pub struct S3ObjectStorage {
    client: Client,
    bucket: String,
}

impl S3ObjectStorage {
    /// Build a client from the storage section
    ///
    /// Explicit `access_key`/`secret_key` take precedence over the default AWS
    /// credential chain.
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let bucket = config.bucket.clone().ok_or_else(|| {
            ShelfportError::Configuration("storage.bucket is required for s3".to_string())
        })?;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let shared = loader.load().await;

        let mut builder =
            aws_sdk_s3::config::Builder::from(&shared).force_path_style(config.force_path_style);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            builder = builder.credentials_provider(Credentials::new(
                access_key,
                secret_key.expose_secret().to_string(),
                None,
                None,
                "shelfport",
            ));
        }

        tracing::info!(
            bucket = %bucket,
            endpoint = config.endpoint.as_deref().unwrap_or("aws"),
            "S3 storage client initialized"
        );

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket,
        })
    }

    async fn put(&self, key: &str, body: ByteStream, content_type: &str) -> Result<()> {
        validate_key(key)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        tracing::debug!(bucket = %self.bucket, key = %key, "Uploaded object");
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<()> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::UploadFailed {
                key: key.to_string(),
                message: format!("cannot read {}: {e}", path.display()),
            })?;
        self.put(key, body, content_type).await
    }

    async fn put_bytes(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.put(key, ByteStream::from(bytes), content_type).await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map(|se| se.is_no_such_key()).unwrap_or(false) {
                    StorageError::ObjectNotFound(key.to_string())
                } else {
                    StorageError::DownloadFailed {
                        key: key.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed {
                key: key.to_string(),
                message: e.to_string(),
            })?
            .into_bytes()
            .to_vec();
        Ok(data)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().map(|se| se.is_not_found()).unwrap_or(false) => {
                Ok(false)
            }
            Err(e) => Err(StorageError::DownloadFailed {
                key: key.to_string(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    // Server-side multipart copy needs parts of at least 5 MiB, which export
    // segments often are not, so parts are concatenated client-side.
    async fn compose(
        &self,
        destination: &str,
        sources: &[String],
        content_type: &str,
    ) -> Result<()> {
        let mut combined = Vec::new();
        for source in sources {
            let part = self.get(source).await.map_err(|e| StorageError::ComposeFailed {
                destination: destination.to_string(),
                message: format!("{source}: {e}"),
            })?;
            combined.extend(part);
        }
        self.put(destination, ByteStream::from(combined), content_type)
            .await
    }
}
