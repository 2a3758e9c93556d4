use std::path::PathBuf;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::region::Region;
use tracing::{debug, info};

/// Destination for relayed media. Objects are written publicly readable
/// and addressed by a deterministic URL.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<()>;

    fn public_url(&self, key: &str) -> String;
}

pub struct S3ObjectStorage {
    bucket: Bucket,
    endpoint: String,
    bucket_name: String,
}

impl S3ObjectStorage {
    pub fn new(
        endpoint: &str,
        region: &str,
        bucket_name: &str,
        access_key: &str,
        secret_key: &str,
    ) -> anyhow::Result<Self> {
        let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)
            .map_err(|e| anyhow!("Invalid object storage credentials: {}", e))?;
        let region = Region::Custom {
            region: region.to_string(),
            endpoint: endpoint.to_string(),
        };

        let mut bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| anyhow!("Failed to configure bucket {}: {}", bucket_name, e))?
            .with_path_style();
        bucket.add_header("x-amz-acl", "public-read");

        info!("Relaying media to bucket: {} at {}", bucket_name, endpoint);
        Ok(Self {
            bucket,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket_name: bucket_name.to_string(),
        })
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<()> {
        let response = self
            .bucket
            .put_object_with_content_type(format!("/{}", key), &bytes, content_type)
            .await
            .map_err(|e| anyhow!("Upload of {} failed: {}", key, e))?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(anyhow!("Object storage answered {} for {}", status, key));
        }

        debug!("Stored object: {} ({} bytes)", key, bytes.len());
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket_name, key)
    }
}

/// Writes objects into the directory served at `/uploads`.
pub struct LocalObjectStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn put_object(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create upload dir {}", self.root.display()))?;
        let path = self.root.join(key);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/uploads/{}", self.public_base_url, key)
    }
}
