//! Multipart upload handlers.
//!
//! The form field is streamed straight into the pipeline; nothing is
//! buffered here beyond what multer holds for the current chunk.

use crate::{
    errors::AppError,
    models::video::Video,
    services::{auth::bearer_token, upload_pipeline::UploadError},
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::HeaderMap,
};
use futures::StreamExt;
use std::io;
use uuid::Uuid;

/// Largest accepted video request body.
pub const MAX_VIDEO_BYTES: usize = 10 << 30;
/// Largest accepted thumbnail request body.
pub const MAX_THUMBNAIL_BYTES: usize = 10 << 20;

/// `POST /api/video_upload/{video_id}` with a `video` form field.
pub async fn upload_video(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Video>, AppError> {
    let token = bearer_token(&headers).map_err(UploadError::from)?;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        if field.name() != Some("video") {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let body = field.map(|chunk| chunk.map_err(io::Error::other));

        let video = state
            .pipeline
            .upload_video(token, video_id, content_type.as_deref(), body)
            .await?;
        return Ok(Json(video));
    }

    Err(AppError::bad_request("Missing `video` form field"))
}

/// `POST /api/thumbnail_upload/{video_id}` with a `thumbnail` form field.
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Video>, AppError> {
    let token = bearer_token(&headers).map_err(UploadError::from)?;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        if field.name() != Some("thumbnail") {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let body = field.map(|chunk| chunk.map_err(io::Error::other));

        let video = state
            .pipeline
            .upload_thumbnail(token, video_id, content_type.as_deref(), body)
            .await?;
        return Ok(Json(video));
    }

    Err(AppError::bad_request("Missing `thumbnail` form field"))
}

fn malformed(err: MultipartError) -> AppError {
    AppError::new(err.status(), format!("Malformed multipart body: {}", err.body_text()))
}
