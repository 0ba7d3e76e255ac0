//! Video record handlers.

use crate::{
    errors::AppError,
    models::video::{NewVideo, Video},
    services::{auth::bearer_token, upload_pipeline::UploadError},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use uuid::Uuid;

/// `POST /api/videos` — create an empty record owned by the caller.
pub async fn create_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(new): Json<NewVideo>,
) -> Result<(StatusCode, Json<Video>), AppError> {
    let token = bearer_token(&headers).map_err(UploadError::from)?;
    if new.title.trim().is_empty() {
        return Err(AppError::bad_request("Title is required"));
    }
    let video = state.pipeline.create_video(token, new).await?;
    Ok((StatusCode::CREATED, Json(video)))
}

/// `GET /api/videos/{video_id}` — the record with a freshly signed `video_url`.
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Video>, AppError> {
    let token = bearer_token(&headers).map_err(UploadError::from)?;
    let video = state.pipeline.get_video(token, video_id).await?;
    Ok(Json(video))
}
