//! Upload pipeline: authorize, validate, stage, classify, fast-start,
//! publish, persist.
//!
//! Each video upload walks the [`Stage`]s in order and stops at the first
//! failure. Staged and processed files are [`TempPath`] guards, so they are
//! removed on every exit path once the request is done with them.

use crate::{
    models::{
        media_type::{MediaTypeError, ThumbnailMediaType, VideoMediaType},
        object_ref::{ObjectKey, REFERENCE_DELIMITER, ReferenceError, StoredObjectReference},
        video::{NewVideo, Video},
    },
    services::{
        aspect_ratio::{self, ClassifyError, Prober},
        auth::{AuthError, TokenValidator},
        faststart::{self, Remuxer, TransformError},
        keygen,
        object_store::{ObjectStore, ObjectStoreError},
        publisher::{self, PublishError},
        video_store::{StoreError, VideoStore},
    },
};
use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::TempPath;
use thiserror::Error;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Progress of a single upload request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Authorized,
    Validated,
    Staged,
    Classified,
    Transformed,
    Published,
    Persisted,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(#[from] AuthError),
    #[error("user `{user_id}` does not own video `{video_id}`")]
    Forbidden { video_id: Uuid, user_id: Uuid },
    #[error("video `{0}` not found")]
    NotFound(Uuid),
    #[error("invalid media type: {0}")]
    InvalidMediaType(#[from] MediaTypeError),
    #[error("metadata store unavailable: {0}")]
    MetadataUnavailable(#[source] StoreError),
    #[error("staging upload failed: {0}")]
    StagingFailed(#[source] io::Error),
    #[error("classification failed: {0}")]
    ClassificationFailed(#[from] ClassifyError),
    #[error("fast-start transform failed: {0}")]
    TransformFailed(#[from] TransformError),
    #[error("publish failed: {0}")]
    PublishFailed(#[from] PublishError),
    /// The upload is stored but the record does not point at it.
    #[error("stored `{reference}` but could not update the record: {source}")]
    PersistFailed {
        reference: String,
        #[source]
        source: StoreError,
    },
    #[error("signing failed: {0}")]
    SigningFailed(#[from] ObjectStoreError),
}

/// Values the pipeline needs from process configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    bucket: String,
    temp_dir: PathBuf,
    assets_root: PathBuf,
    public_base_url: String,
}

impl PipelineConfig {
    pub fn new(
        bucket: impl Into<String>,
        temp_dir: impl Into<PathBuf>,
        assets_root: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Result<Self, ReferenceError> {
        let bucket = bucket.into();
        if bucket.is_empty() {
            return Err(ReferenceError::EmptyComponent);
        }
        if bucket.contains(REFERENCE_DELIMITER) {
            return Err(ReferenceError::DelimiterInComponent(bucket));
        }
        Ok(Self {
            bucket,
            temp_dir: temp_dir.into(),
            assets_root: assets_root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn assets_root(&self) -> &Path {
        &self.assets_root
    }
}

/// Composition root for the upload and read paths.
#[derive(Clone)]
pub struct UploadPipeline {
    config: Arc<PipelineConfig>,
    tokens: Arc<dyn TokenValidator>,
    videos: Arc<dyn VideoStore>,
    prober: Arc<dyn Prober>,
    remuxer: Arc<dyn Remuxer>,
    objects: Arc<dyn ObjectStore>,
}

impl UploadPipeline {
    pub fn new(
        config: PipelineConfig,
        tokens: Arc<dyn TokenValidator>,
        videos: Arc<dyn VideoStore>,
        prober: Arc<dyn Prober>,
        remuxer: Arc<dyn Remuxer>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            tokens,
            videos,
            prober,
            remuxer,
            objects,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Upload a video for `video_id` and return the record with a presigned
    /// `video_url`.
    #[instrument(skip_all, fields(video_id = %video_id))]
    pub async fn upload_video<S>(
        &self,
        token: &str,
        video_id: Uuid,
        content_type: Option<&str>,
        body: S,
    ) -> Result<Video, UploadError>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let mut stage = Stage::Received;
        let result = self
            .run_video_upload(&mut stage, token, video_id, content_type, body)
            .await;
        if let Err(err) = &result {
            warn!(stage = ?stage, error = %err, "video upload aborted");
        }
        result
    }

    async fn run_video_upload<S>(
        &self,
        stage: &mut Stage,
        token: &str,
        video_id: Uuid,
        content_type: Option<&str>,
        body: S,
    ) -> Result<Video, UploadError>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let user_id = self.authenticate(token)?;
        *stage = Stage::Authorized;

        let mut video = self.owned_video(video_id, user_id).await?;
        let media = VideoMediaType::parse(content_type.unwrap_or_default())?;
        *stage = Stage::Validated;

        let staged = self.stage_body(body, ".mp4").await?;
        *stage = Stage::Staged;

        let aspect = aspect_ratio::classify(self.prober.as_ref(), &staged).await?;
        *stage = Stage::Classified;

        let processed = faststart::rewrite_for_streaming(self.remuxer.as_ref(), &staged).await?;
        *stage = Stage::Transformed;

        let key = ObjectKey::video(aspect, &keygen::random_id(), media.extension());
        let reference = StoredObjectReference::new(self.config.bucket(), key.as_str())
            .map_err(PublishError::InvalidReference)?;
        let published = publisher::publish_file(
            self.objects.as_ref(),
            reference.bucket(),
            reference.key(),
            &processed,
            media.mime(),
        )
        .await;
        drop(processed);
        drop(staged);
        let size_bytes = published?;
        *stage = Stage::Published;

        video.video_url = Some(reference.encode());
        self.persist(
            &video,
            reference.encode(),
            "record update failed after storing upload; stored object is orphaned",
        )
        .await?;
        *stage = Stage::Persisted;

        info!(
            bucket = reference.bucket(),
            key = reference.key(),
            aspect = %aspect,
            size_bytes,
            "video published"
        );

        Ok(publisher::sign_video(self.objects.as_ref(), video).await?)
    }

    /// Store a thumbnail under `assets_root` and point the record at it.
    #[instrument(skip_all, fields(video_id = %video_id))]
    pub async fn upload_thumbnail<S>(
        &self,
        token: &str,
        video_id: Uuid,
        content_type: Option<&str>,
        body: S,
    ) -> Result<Video, UploadError>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let user_id = self.authenticate(token)?;
        let mut video = self.owned_video(video_id, user_id).await?;
        let media = ThumbnailMediaType::parse(content_type.unwrap_or_default())?;

        let file_name = ObjectKey::thumbnail(&keygen::random_id(), media.extension());
        let asset = TempPath::try_from_path(self.config.assets_root.join(file_name.as_str()))
            .map_err(UploadError::StagingFailed)?;
        let file = File::create(&asset)
            .await
            .map_err(UploadError::StagingFailed)?;
        write_stream(file, body)
            .await
            .map_err(UploadError::StagingFailed)?;
        let asset_path = asset
            .keep()
            .map_err(|err| UploadError::StagingFailed(err.error))?;

        video.thumbnail_url = Some(format!(
            "{}/assets/{}",
            self.config.public_base_url, file_name
        ));
        let persisted = self
            .persist(
                &video,
                file_name.to_string(),
                "record update failed after writing thumbnail; removing asset",
            )
            .await;
        if let Err(err) = persisted {
            if let Err(cleanup) = tokio::fs::remove_file(&asset_path).await {
                warn!(
                    asset = %asset_path.display(),
                    error = %cleanup,
                    "could not remove thumbnail asset"
                );
            }
            return Err(err);
        }

        info!(asset = %asset_path.display(), "thumbnail stored");
        Ok(publisher::sign_video(self.objects.as_ref(), video).await?)
    }

    /// Create an empty record owned by the caller.
    pub async fn create_video(&self, token: &str, new: NewVideo) -> Result<Video, UploadError> {
        let user_id = self.authenticate(token)?;
        let video = self
            .videos
            .create(user_id, new)
            .await
            .map_err(UploadError::MetadataUnavailable)?;
        info!(video_id = %video.id, user_id = %user_id, "video record created");
        Ok(video)
    }

    /// Read a record, re-deriving a presigned URL for its stored video.
    pub async fn get_video(&self, token: &str, video_id: Uuid) -> Result<Video, UploadError> {
        self.authenticate(token)?;
        let video = self.fetch(video_id).await?;
        Ok(publisher::sign_video(self.objects.as_ref(), video).await?)
    }

    fn authenticate(&self, token: &str) -> Result<Uuid, UploadError> {
        Ok(self.tokens.validate(token)?)
    }

    async fn fetch(&self, video_id: Uuid) -> Result<Video, UploadError> {
        self.videos.get(video_id).await.map_err(|err| match err {
            StoreError::NotFound(id) => UploadError::NotFound(id),
            other => UploadError::MetadataUnavailable(other),
        })
    }

    async fn owned_video(&self, video_id: Uuid, user_id: Uuid) -> Result<Video, UploadError> {
        let video = self.fetch(video_id).await?;
        if video.user_id != user_id {
            return Err(UploadError::Forbidden { video_id, user_id });
        }
        Ok(video)
    }

    /// Write `video` back, logging `failure` with the stored reference if it fails.
    async fn persist(
        &self,
        video: &Video,
        reference: String,
        failure: &'static str,
    ) -> Result<(), UploadError> {
        self.videos.update(video).await.map_err(|source| {
            error!(
                video_id = %video.id,
                reference = %reference,
                error = %source,
                "{failure}"
            );
            UploadError::PersistFailed { reference, source }
        })
    }

    /// Write the request body to a fresh temp file under `temp_dir`.
    async fn stage_body<S>(&self, body: S, suffix: &str) -> Result<TempPath, UploadError>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let (file, path) = tempfile::Builder::new()
            .prefix("tubely-upload")
            .suffix(suffix)
            .tempfile_in(&self.config.temp_dir)
            .map_err(UploadError::StagingFailed)?
            .into_parts();

        let size = write_stream(File::from_std(file), body)
            .await
            .map_err(UploadError::StagingFailed)?;
        debug!(path = %path.display(), size_bytes = size, "upload staged");
        Ok(path)
    }
}

async fn write_stream<S>(mut file: File, body: S) -> io::Result<u64>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    let mut size = 0u64;
    pin_mut!(body);
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        size += chunk.len() as u64;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok(size)
}
