use std::sync::Arc;

use axum::extract::Multipart;
use axum::routing::post;
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::controller::AppState;
use crate::helpers::api_error::ApiError;
use crate::services::media_service::{IncomingFile, MediaService, MAX_UPLOAD_FILES};

const PICTURES_FIELD: &str = "pictures";

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/upload-with-link", post(upload_with_link))
        .route("/upload", post(upload_pictures))
        .route_layer(Extension(app_state.media))
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UploadWithLink {
    pub link: String,
}

pub async fn upload_with_link(
    Extension(media): Extension<Arc<MediaService>>,
    Json(body): Json<UploadWithLink>,
) -> Result<Json<String>, ApiError> {
    let url = media.ingest_from_url(&body.link).await?;
    Ok(Json(url))
}

pub async fn upload_pictures(
    Extension(media): Extension<Arc<MediaService>>,
    mut multipart: Multipart,
) -> Result<Json<Vec<String>>, ApiError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Malformed multipart upload: {}", e);
        ApiError::BadRequest("malformed multipart body".to_string())
    })? {
        if field.name() != Some(PICTURES_FIELD) {
            continue;
        }
        if files.len() == MAX_UPLOAD_FILES {
            return Err(ApiError::BadRequest(format!(
                "at most {} files can be uploaded at once",
                MAX_UPLOAD_FILES
            )));
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(|e| {
            warn!("Failed to read uploaded file {}: {}", original_name, e);
            ApiError::BadRequest("could not read uploaded file".to_string())
        })?;

        files.push(IncomingFile {
            original_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    let urls = media.ingest_uploads(files).await?;
    Ok(Json(urls))
}
