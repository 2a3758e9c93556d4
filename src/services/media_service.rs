//! Media ingestion: stage incoming images on local disk, then relay them
//! to object storage and hand back their public URLs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::helpers::api_error::ApiError;
use crate::services::object_storage::ObjectStorage;

pub const MAX_UPLOAD_FILES: usize = 100;

const DOWNLOADED_EXTENSION: &str = "jpeg";
const DOWNLOADED_CONTENT_TYPE: &str = "image/jpeg";

/// A file received in a multipart submission.
#[derive(Clone, Debug)]
pub struct IncomingFile {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub struct MediaService {
    storage: Arc<dyn ObjectStorage>,
    staging_dir: PathBuf,
    http_client: reqwest::Client,
}

impl MediaService {
    pub fn new(storage: Arc<dyn ObjectStorage>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            staging_dir: staging_dir.into(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Downloads `link`, stages it as a `.jpeg` whatever its real type, and relays it.
    pub async fn ingest_from_url(&self, link: &str) -> Result<String, ApiError> {
        let response = self
            .http_client
            .get(link)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| {
                warn!("Failed to download image from {}: {}", link, e);
                ApiError::Upstream(format!("could not download {}", link))
            })?;
        let bytes = response.bytes().await.map_err(|e| {
            warn!("Failed to read image body from {}: {}", link, e);
            ApiError::Upstream(format!("could not download {}", link))
        })?;

        let staged_name = format!("{}.{}", Uuid::now_v7(), DOWNLOADED_EXTENSION);
        let staged_path = self.stage(&staged_name, &bytes).await?;
        self.relay_and_cleanup(&staged_path, &staged_name, DOWNLOADED_CONTENT_TYPE)
            .await
    }

    /// Relays each file in order, one at a time. URLs come back in input order.
    pub async fn ingest_uploads(&self, files: Vec<IncomingFile>) -> Result<Vec<String>, ApiError> {
        if files.len() > MAX_UPLOAD_FILES {
            return Err(ApiError::BadRequest(format!(
                "at most {} files can be uploaded at once",
                MAX_UPLOAD_FILES
            )));
        }

        let mut uploads = Vec::with_capacity(files.len());
        for file in files {
            let staged_name = format!("{}", Uuid::new_v4());
            let staged_path = self.stage(&staged_name, &file.bytes).await?;
            let url = self
                .relay_and_cleanup(&staged_path, &file.original_name, &file.content_type)
                .await?;
            uploads.push(url);
        }

        info!("Relayed {} uploaded file(s)", uploads.len());
        Ok(uploads)
    }

    /// Copies a staged file to object storage under a fresh key that keeps
    /// the original extension, returning the public URL.
    pub async fn relay(
        &self,
        local_path: &Path,
        original_name: &str,
        content_type: &str,
    ) -> Result<String, ApiError> {
        let bytes = tokio::fs::read(local_path).await.map_err(|e| {
            ApiError::Internal(format!("failed to read staged file {}: {}", local_path.display(), e))
        })?;

        let key = object_key(original_name);
        self.storage
            .put_object(&key, bytes, content_type)
            .await
            .map_err(|e| {
                warn!("Failed to relay {} to object storage: {:#}", key, e);
                ApiError::Upstream("object storage upload failed".to_string())
            })?;

        Ok(self.storage.public_url(&key))
    }

    async fn stage(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, ApiError> {
        tokio::fs::create_dir_all(&self.staging_dir)
            .await
            .map_err(|e| ApiError::Internal(format!("failed to create staging dir: {}", e)))?;
        let path = self.staging_dir.join(name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ApiError::Internal(format!("failed to stage {}: {}", path.display(), e)))?;
        Ok(path)
    }

    async fn relay_and_cleanup(
        &self,
        staged_path: &Path,
        original_name: &str,
        content_type: &str,
    ) -> Result<String, ApiError> {
        let relayed = self.relay(staged_path, original_name, content_type).await;
        if let Err(e) = tokio::fs::remove_file(staged_path).await {
            warn!("Failed to remove staged file {}: {}", staged_path.display(), e);
        }
        relayed
    }
}

/// Text after the last `.`, or the whole name when there is none.
pub fn original_extension(original_name: &str) -> &str {
    original_name.rsplit('.').next().unwrap_or(original_name)
}

pub fn object_key(original_name: &str) -> String {
    format!("{}.{}", Uuid::now_v7(), original_extension(original_name))
}
