use crate::services::upload_pipeline::UploadPipeline;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: UploadPipeline,
    pub db: Arc<SqlitePool>,
}
