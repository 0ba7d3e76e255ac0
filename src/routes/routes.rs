//! HTTP routes.
//!
//! - `POST /api/videos`                         create a record
//! - `GET  /api/videos/{video_id}`              read a record (signed `video_url`)
//! - `POST /api/video_upload/{video_id}`        multipart `video`, up to 10 GiB
//! - `POST /api/thumbnail_upload/{video_id}`    multipart `thumbnail`, up to 10 MiB
//! - `GET  /assets/{*file}`                     stored thumbnails
//! - `GET  /healthz`, `GET /readyz`

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        upload_handlers::{MAX_THUMBNAIL_BYTES, MAX_VIDEO_BYTES, upload_thumbnail, upload_video},
        video_handlers::{create_video, get_video},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::path::Path;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Build the application router over `AppState`.
pub fn routes(assets_root: &Path) -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/videos", post(create_video))
        .route("/api/videos/{video_id}", get(get_video))
        .route(
            "/api/video_upload/{video_id}",
            post(upload_video).layer(DefaultBodyLimit::max(MAX_VIDEO_BYTES)),
        )
        .route(
            "/api/thumbnail_upload/{video_id}",
            post(upload_thumbnail).layer(DefaultBodyLimit::max(MAX_THUMBNAIL_BYTES)),
        )
        .nest_service("/assets", ServeDir::new(assets_root))
        .layer(TraceLayer::new_for_http())
}
