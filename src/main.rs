use std::sync::Arc;

use anyhow::Context;
use booking_app_backend::config::{Config, MediaBackend, StoreBackend};
use booking_app_backend::controller::{self, AppState};
use booking_app_backend::repositories::memory_repo::InMemoryRepo;
use booking_app_backend::repositories::postgres_repo::{self, PostgresConnectionRepo};
use booking_app_backend::services::media_service::MediaService;
use booking_app_backend::services::object_storage::{
    LocalObjectStorage, ObjectStorage, S3ObjectStorage,
};
use booking_app_backend::services::session_service::SessionManager;
use clap::Parser;
use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    info!("Starting booking backend in {} environment", config.environment);

    let storage: Arc<dyn ObjectStorage> = match config.media_backend {
        MediaBackend::S3 => {
            let (access_key, secret_key) = config.s3_credentials()?;
            Arc::new(S3ObjectStorage::new(
                &config.s3_endpoint,
                &config.s3_region,
                &config.s3_bucket,
                access_key,
                secret_key,
            )?)
        }
        MediaBackend::Local => {
            info!("Storing media under: {}", config.upload_dir.display());
            Arc::new(LocalObjectStorage::new(&config.upload_dir, &config.public_base_url))
        }
    };
    let media = MediaService::new(storage, &config.staging_dir);
    let sessions = SessionManager::new(&config.jwt_secret);

    match config.store_backend {
        StoreBackend::Postgres => {
            let pool = postgres_repo::connect(config.database_url()?, config.db_pool_size).await?;
            let repo = Arc::new(PostgresConnectionRepo::new(pool));
            repo.ensure_schema().await?;

            controller::serve(AppState::new(repo.clone(), sessions, media), &config)
                .await
                .context("API server exited with an error")?;
            drop(repo);
            info!("Postgres connection pool closed");
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store, data will not survive a restart");
            let repo = Arc::new(InMemoryRepo::new());
            controller::serve(AppState::new(repo, sessions, media), &config)
                .await
                .context("API server exited with an error")?;
        }
    }

    info!("Shutdown complete");
    Ok(())
}
