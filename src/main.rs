use anyhow::{Context, Result};
use axum::Router;
use sqlx::sqlite::SqlitePoolOptions;
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use services::{
    aspect_ratio::FfprobeProber,
    auth::JwtValidator,
    faststart::FfmpegRemuxer,
    object_store::S3ObjectStore,
    upload_pipeline::{PipelineConfig, UploadPipeline},
    video_store::{SqliteVideoStore, run_migrations},
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!(
        addr = %cfg.addr(),
        bucket = %cfg.s3_bucket,
        region = %cfg.s3_region,
        assets_root = %cfg.assets_root.display(),
        temp_dir = %cfg.temp_dir.display(),
        "Starting tubely"
    );

    // --- Ensure local directories exist ---
    for dir in [&cfg.assets_root, &cfg.temp_dir] {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating directory {}", dir.display()))?;
            tracing::info!("Created directory at {}", dir.display());
        }
    }

    // --- Initialize SQLite connection ---
    let db_url = &cfg.database_url;
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("file:");
    tracing::debug!("Interpreted SQLite path => {}", db_path);

    let db_path_obj = Path::new(db_path);
    if let Some(parent) = db_path_obj.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    // SQLx will not create the file itself without `mode=rwc`
    if let Err(e) = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(db_path_obj)
    {
        tracing::warn!("Failed to open database file manually: {}", e);
    }

    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
            .with_context(|| format!("connecting to {}", db_url))?,
    );

    // --- Migrations: always idempotent, `--migrate` stops afterwards ---
    let applied = run_migrations(&db).await?;
    tracing::info!("Applied {} migration statements", applied);
    if migrate {
        tracing::info!("Database migration complete.");
        return Ok(());
    }

    // --- Collaborators ---
    let objects = S3ObjectStore::new(&cfg.s3_region, cfg.s3_endpoint.as_deref()).await;
    let pipeline_config = PipelineConfig::new(
        cfg.s3_bucket.clone(),
        cfg.temp_dir.clone(),
        cfg.assets_root.clone(),
        cfg.public_base_url.clone(),
    )
    .context("invalid bucket name")?;

    let pipeline = UploadPipeline::new(
        pipeline_config,
        Arc::new(JwtValidator::new(&cfg.jwt_secret)),
        Arc::new(SqliteVideoStore::new(db.clone())),
        Arc::new(FfprobeProber::new(cfg.ffprobe_bin.clone(), cfg.tool_timeout)),
        Arc::new(FfmpegRemuxer::new(cfg.ffmpeg_bin.clone(), cfg.tool_timeout)),
        Arc::new(objects),
    );

    // --- Build router ---
    let app: Router =
        routes::routes::routes(&cfg.assets_root).with_state(state::AppState { pipeline, db });

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
