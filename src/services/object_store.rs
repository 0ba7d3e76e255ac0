//! Object store seam and its S3 implementation.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client as S3Client, config::Builder as S3ConfigBuilder, presigning::PresigningConfig,
    primitives::ByteStream,
};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("put `{bucket}/{key}` failed: {reason}")]
    Put {
        bucket: String,
        key: String,
        reason: String,
    },
    #[error("presigning `{bucket}/{key}` failed: {reason}")]
    Presign {
        bucket: String,
        key: String,
        reason: String,
    },
}

/// Minimal object store surface used by the upload pipeline.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` at `(bucket, key)`; the object is visible only once the
    /// put completes.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream,
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;

    /// Signed GET URL valid for `ttl`. Never touches the stored object.
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, ObjectStoreError>;
}

/// S3 (or S3-compatible) object store.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: S3Client,
}

impl S3ObjectStore {
    /// Build a client from the default AWS credential chain.
    ///
    /// `endpoint_url` points at an S3-compatible service (MinIO, LocalStack)
    /// and switches to path-style addressing.
    pub async fn new(region: &str, endpoint_url: Option<&str>) -> Self {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        let mut builder = S3ConfigBuilder::from(&aws_config);
        if let Some(endpoint) = endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        info!(region, endpoint = ?endpoint_url, "S3 object store initialized");

        Self {
            client: S3Client::from_conf(builder.build()),
        }
    }

    #[cfg(test)]
    pub fn from_client(client: S3Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let start = Instant::now();

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    bucket,
                    key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 put failed"
                );
                ObjectStoreError::Put {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    reason: e.to_string(),
                }
            })?;

        info!(
            bucket,
            key,
            content_type,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 put successful"
        );
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, ObjectStoreError> {
        let presign_err = |reason: String| ObjectStoreError::Presign {
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason,
        };

        let presigning_config =
            PresigningConfig::expires_in(ttl).map_err(|e| presign_err(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| presign_err(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }
}
