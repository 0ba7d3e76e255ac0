use crate::services::{
    aspect_ratio::ClassifyError, process::ProcessError, upload_pipeline::UploadError,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// HTTP-facing error: a status plus a short message safe to show clients.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match &err {
            UploadError::Unauthenticated(_) => {
                Self::new(StatusCode::UNAUTHORIZED, "Couldn't validate credentials")
            }
            UploadError::Forbidden { .. } => {
                Self::new(StatusCode::FORBIDDEN, "Not the owner of this video")
            }
            UploadError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "Video not found"),
            UploadError::InvalidMediaType(inner) => {
                Self::bad_request(format!("Unsupported media type: {inner}"))
            }
            UploadError::ClassificationFailed(ClassifyError::Probe(
                ProcessError::Spawn { .. } | ProcessError::TimedOut { .. },
            )) => {
                tracing::error!(error = %err, "ffprobe unavailable");
                Self::internal("Couldn't inspect video")
            }
            UploadError::ClassificationFailed(_) => {
                tracing::warn!(error = %err, "rejecting unreadable upload");
                Self::bad_request("Could not read video dimensions")
            }
            UploadError::StagingFailed(_) => {
                tracing::error!(error = %err, "upload staging failed");
                Self::internal("Couldn't save upload")
            }
            UploadError::TransformFailed(_) => {
                tracing::error!(error = %err, "fast-start transform failed");
                Self::internal("Couldn't process video")
            }
            UploadError::PublishFailed(_) => {
                tracing::error!(error = %err, "publish failed");
                Self::internal("Couldn't store video")
            }
            UploadError::PersistFailed { .. } => Self::internal("Couldn't update video"),
            UploadError::MetadataUnavailable(_) => {
                tracing::error!(error = %err, "metadata store unavailable");
                Self::internal("Couldn't load video")
            }
            UploadError::SigningFailed(_) => {
                tracing::error!(error = %err, "presigning failed");
                Self::internal("Couldn't sign video URL")
            }
        }
    }
}
