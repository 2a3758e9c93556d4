use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, ValueEnum};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaBackend {
    S3,
    Local,
}

#[derive(Parser, Clone, Debug)]
#[clap(name = "booking-app-backend", about = "Booking platform REST API")]
pub struct Config {
    #[clap(env, long, default_value = "development")]
    pub environment: String,

    #[clap(env, long, default_value_t = 3000)]
    pub port: u16,

    /// Comma separated list of origins allowed to call the API with credentials.
    #[clap(env, long, default_value = "http://localhost:5173")]
    pub origin_urls: String,

    #[clap(env, long, value_enum, default_value_t = StoreBackend::Postgres)]
    pub store_backend: StoreBackend,

    #[clap(env, long)]
    pub database_url: Option<String>,

    #[clap(env, long, default_value_t = num_cpus::get() as u32)]
    pub db_pool_size: u32,

    #[clap(env, long, hide_env_values = true)]
    pub jwt_secret: String,

    #[clap(env, long, value_enum, default_value_t = MediaBackend::S3)]
    pub media_backend: MediaBackend,

    #[clap(env, long, hide_env_values = true)]
    pub s3_access_key: Option<String>,

    #[clap(env, long, hide_env_values = true)]
    pub s3_secret_access_key: Option<String>,

    #[clap(env, long, default_value = "https://s3.tebi.io")]
    pub s3_endpoint: String,

    #[clap(env, long, default_value = "global")]
    pub s3_region: String,

    #[clap(env, long, default_value = "booking-app")]
    pub s3_bucket: String,

    #[clap(env, long, default_value = "uploads")]
    pub upload_dir: PathBuf,

    #[clap(env, long, default_value = "tmp")]
    pub staging_dir: PathBuf,

    #[clap(env, long, default_value = "http://localhost:3000")]
    pub public_base_url: String,

    #[clap(env, long, default_value_t = 50 * 1024 * 1024)]
    pub max_body_bytes: usize,
}

impl Config {
    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| anyhow!("DATABASE_URL must be set when STORE_BACKEND=postgres"))
    }

    pub fn s3_credentials(&self) -> anyhow::Result<(&str, &str)> {
        let access_key = self
            .s3_access_key
            .as_deref()
            .context("S3_ACCESS_KEY must be set when MEDIA_BACKEND=s3")?;
        let secret_key = self
            .s3_secret_access_key
            .as_deref()
            .context("S3_SECRET_ACCESS_KEY must be set when MEDIA_BACKEND=s3")?;
        Ok((access_key, secret_key))
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.origin_urls
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}
