//! Video metadata store backed by SQLite.

use crate::models::video::{NewVideo, Video};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Schema applied at startup (and by `--migrate`).
pub const MIGRATION_SQL: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("video `{0}` not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value style access to video records.
///
/// Concurrent updates of the same record are last-writer-wins.
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn get(&self, id: Uuid) -> StoreResult<Video>;
    async fn update(&self, video: &Video) -> StoreResult<()>;
    async fn create(&self, user_id: Uuid, new: NewVideo) -> StoreResult<Video>;
}

#[derive(Clone)]
pub struct SqliteVideoStore {
    pub db: Arc<SqlitePool>,
}

impl SqliteVideoStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

/// Run the embedded schema one statement at a time.
pub async fn run_migrations(db: &SqlitePool) -> Result<usize, sqlx::Error> {
    let statements = MIGRATION_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    for stmt in &statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(*stmt).execute(db).await?;
    }
    Ok(statements.len())
}

#[async_trait]
impl VideoStore for SqliteVideoStore {
    async fn get(&self, id: Uuid) -> StoreResult<Video> {
        sqlx::query_as::<_, Video>(
            "SELECT id, created_at, updated_at, title, description,
                    thumbnail_url, video_url, user_id
             FROM videos WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StoreError::NotFound(id),
            other => StoreError::Sqlx(other),
        })
    }

    async fn update(&self, video: &Video) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE videos
             SET title = ?, description = ?, thumbnail_url = ?, video_url = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.thumbnail_url)
        .bind(&video.video_url)
        .bind(Utc::now())
        .bind(video.id)
        .execute(&*self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(video.id));
        }
        Ok(())
    }

    async fn create(&self, user_id: Uuid, new: NewVideo) -> StoreResult<Video> {
        let now = Utc::now();
        let video = sqlx::query_as::<_, Video>(
            "INSERT INTO videos (id, created_at, updated_at, title, description, user_id)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id, created_at, updated_at, title, description,
                       thumbnail_url, video_url, user_id",
        )
        .bind(Uuid::new_v4())
        .bind(now)
        .bind(now)
        .bind(&new.title)
        .bind(&new.description)
        .bind(user_id)
        .fetch_one(&*self.db)
        .await?;
        Ok(video)
    }
}

#[cfg(test)]
pub(crate) async fn memory_store() -> SqliteVideoStore {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    SqliteVideoStore::new(Arc::new(pool))
}
