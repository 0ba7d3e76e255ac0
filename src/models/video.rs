//! Represents a video record owned by a single user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A video's metadata record.
///
/// Created before any upload happens; the upload paths only ever fill in
/// `video_url` and `thumbnail_url`, and only for the owning user.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct Video {
    /// Video identifier, also used in upload routes.
    pub id: Uuid,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub title: String,

    pub description: String,

    /// Public URL of the thumbnail, if one was uploaded.
    pub thumbnail_url: Option<String>,

    /// Persisted as an encoded `bucket,key` reference. Responses replace it
    /// with a short-lived presigned URL.
    pub video_url: Option<String>,

    /// Owner of the record.
    pub user_id: Uuid,
}

/// Fields needed to create a new record.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVideo {
    pub title: String,
    #[serde(default)]
    pub description: String,
}
