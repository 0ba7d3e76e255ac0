//! In-process fakes shared by service tests.

use crate::services::{
    aspect_ratio::{ClassifyError, ProbeReport, ProbeStream, Prober},
    faststart::{Remuxer, TransformError},
    object_store::{ObjectStore, ObjectStoreError},
    process::ProcessError,
};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    fail_puts: bool,
    fail_presign: bool,
}

impl MemoryObjectStore {
    pub fn failing_puts() -> Self {
        Self {
            fail_puts: true,
            ..Self::default()
        }
    }

    pub fn failing_presign() -> Self {
        Self {
            fail_presign: true,
            ..Self::default()
        }
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys(&self) -> Vec<(String, String)> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let put_err = |reason: String| ObjectStoreError::Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason,
        };
        if self.fail_puts {
            return Err(put_err("injected failure".into()));
        }
        let body = body
            .collect()
            .await
            .map_err(|e| put_err(e.to_string()))?
            .into_bytes()
            .to_vec();
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, ObjectStoreError> {
        if self.fail_presign {
            return Err(ObjectStoreError::Presign {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: "injected failure".into(),
            });
        }
        Ok(format!(
            "https://objects.test/{}/{}?expires={}",
            bucket,
            key,
            ttl.as_secs()
        ))
    }
}

/// Reports a single video stream with fixed dimensions.
pub struct FixedProber {
    pub width: u32,
    pub height: u32,
}

#[async_trait]
impl Prober for FixedProber {
    async fn probe(&self, _path: &Path) -> Result<ProbeReport, ClassifyError> {
        Ok(ProbeReport {
            streams: vec![ProbeStream {
                codec_type: Some("video".into()),
                width: self.width,
                height: self.height,
            }],
        })
    }
}

/// Always fails as if ffprobe had crashed.
pub struct BrokenProber;

#[async_trait]
impl Prober for BrokenProber {
    async fn probe(&self, _path: &Path) -> Result<ProbeReport, ClassifyError> {
        Err(ClassifyError::Probe(ProcessError::TimedOut {
            program: "ffprobe".into(),
            timeout: Duration::from_secs(1),
        }))
    }
}

/// Copies input to output unchanged and records what it saw.
#[derive(Default)]
pub struct CopyRemuxer {
    pub seen: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl Remuxer for CopyRemuxer {
    async fn remux(&self, input: &Path, output: &Path) -> Result<(), TransformError> {
        self.seen.lock().unwrap().push(input.to_path_buf());
        tokio::fs::copy(input, output)
            .await
            .map_err(|_| TransformError::MissingOutput(output.to_path_buf()))?;
        Ok(())
    }
}

/// Leaves a partial output behind and fails.
pub struct FailingRemuxer;

#[async_trait]
impl Remuxer for FailingRemuxer {
    async fn remux(&self, _input: &Path, output: &Path) -> Result<(), TransformError> {
        let _ = tokio::fs::write(output, b"partial").await;
        Err(TransformError::MissingOutput(output.to_path_buf()))
    }
}
