//! The storage uploader: pushes transcoded artifacts to durable storage.
//!
//! Destination keys are namespaced by output format so same-named outputs
//! across formats never collide, and within a format the request id keeps
//! keys unique.

use async_trait::async_trait;
use std::path::Path;

use optivid_models::{OutputFormat, RequestId};

use crate::client::{R2Client, R2Config};
use crate::error::StorageResult;

/// A successfully stored artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    /// Object key inside the bucket
    pub key: String,
    /// Public URL the artifact is served from
    pub public_url: String,
}

/// The storage seam consumed by the job orchestrator.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Push one transcoded artifact to durable storage.
    async fn upload(
        &self,
        local_path: &Path,
        format: OutputFormat,
        request_id: &RequestId,
    ) -> StorageResult<StoredArtifact>;
}

/// Production artifact store backed by Cloudflare R2.
#[derive(Clone)]
pub struct R2ArtifactStore {
    client: R2Client,
    public_base_url: String,
}

impl R2ArtifactStore {
    pub fn new(config: &R2Config) -> Self {
        Self {
            client: R2Client::new(config),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Access the underlying client (used by the readiness probe).
    pub fn client(&self) -> &R2Client {
        &self.client
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

#[async_trait]
impl ArtifactStore for R2ArtifactStore {
    async fn upload(
        &self,
        local_path: &Path,
        format: OutputFormat,
        request_id: &RequestId,
    ) -> StorageResult<StoredArtifact> {
        let key = object_key(format, request_id);
        self.client
            .upload_file(local_path, &key, format.content_type())
            .await?;
        let public_url = self.public_url(&key);
        Ok(StoredArtifact { key, public_url })
    }
}

/// Object key for one (request, format) artifact: one logical prefix per format.
pub fn object_key(format: OutputFormat, request_id: &RequestId) -> String {
    format!("{}/{}.{}", format, request_id, format.extension())
}
