//! Publishing processed files and issuing presigned URLs for them.

use crate::{
    models::{
        object_ref::{ReferenceError, StoredObjectReference},
        video::Video,
    },
    services::object_store::{ObjectStore, ObjectStoreError},
};
use aws_sdk_s3::primitives::{ByteStream, ByteStreamError};
use chrono::{DateTime, Utc};
use std::{path::Path, time::Duration};
use thiserror::Error;
use tracing::{debug, instrument};

/// Lifetime of every presigned video URL handed to clients.
pub const PRESIGN_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("could not open `{path}` for upload: {source}")]
    Open {
        path: String,
        #[source]
        source: ByteStreamError,
    },
    #[error("cannot reference stored object: {0}")]
    InvalidReference(#[from] ReferenceError),
    #[error(transparent)]
    Store(#[from] ObjectStoreError),
}

/// Stream a local file to `(bucket, key)`.
///
/// The body is read from disk as it is sent; the file is never loaded into
/// memory as a whole. Returns the number of bytes published.
#[instrument(skip(store, path), fields(path = %path.display()))]
pub async fn publish_file(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    path: &Path,
    content_type: &str,
) -> Result<u64, PublishError> {
    let body = ByteStream::from_path(path)
        .await
        .map_err(|source| PublishError::Open {
            path: path.display().to_string(),
            source,
        })?;
    let size = body.size_hint().0;

    store.put_object(bucket, key, body, content_type).await?;

    debug!(size_bytes = size, "published object");
    Ok(size)
}

/// A presigned URL and the instant it stops working.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Issue a GET URL for `reference` valid for `ttl` from now.
pub async fn issue(
    store: &dyn ObjectStore,
    reference: &StoredObjectReference,
    ttl: Duration,
) -> Result<SignedUrl, ObjectStoreError> {
    let issued_at = Utc::now();
    let url = store
        .presign_get(reference.bucket(), reference.key(), ttl)
        .await?;
    let expires_at = chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| issued_at.checked_add_signed(ttl))
        .unwrap_or(issued_at);

    Ok(SignedUrl { url, expires_at })
}

/// Copy of `video` whose `video_url` is a fresh presigned URL.
///
/// Records without a stored reference (no upload yet, or a value that does
/// not decode as `bucket,key`) are returned untouched. Nothing is written
/// back to the store.
pub async fn sign_video(store: &dyn ObjectStore, mut video: Video) -> Result<Video, ObjectStoreError> {
    let Some(reference) = video
        .video_url
        .as_deref()
        .and_then(|raw| StoredObjectReference::decode(raw).ok())
    else {
        return Ok(video);
    };

    let signed = issue(store, &reference, PRESIGN_TTL).await?;
    video.video_url = Some(signed.url);
    Ok(video)
}
