use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::StorageConfig;

const CACHE_CONTROL: &str = "public, max-age=31536000";

/// Object-storage seam. `put` returns the public URL of the stored object.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;
}

/// HTTP object store: authenticated PUT against an S3-compatible endpoint,
/// public URL at `<endpoint>/<bucket>/<key>`.
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    token: String,
}

impl HttpObjectStore {
    pub fn new(client: reqwest::Client, cfg: &StorageConfig) -> Self {
        Self {
            client,
            endpoint: cfg.endpoint.clone(),
            bucket: cfg.bucket.clone(),
            token: cfg.token.clone(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let url = self.object_url(key);
        self.client
            .put(&url)
            .bearer_auth(&self.token)
            .header("content-type", content_type)
            .header("cache-control", CACHE_CONTROL)
            .body(bytes)
            .send()
            .await
            .with_context(|| format!("Upload request failed for {}", key))?
            .error_for_status()
            .with_context(|| format!("Upload rejected for {}", key))?;
        Ok(url)
    }
}
