//! Image Relay
//!
//! Moves staged multipart files to the remote image host. Every staged file is
//! removed from local disk once its upload settles, whatever the outcome.
//! Assets that end up unreferenced because a sibling upload or the following
//! store write failed are deleted again through [`ImageRelay::discard`].

use async_trait::async_trait;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A durably stored remote asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// Public HTTPS URL stored in the product record
    pub url: String,
    /// Host-side identifier, needed to delete the asset again
    pub public_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("failed to read staged file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image host request failed: {0}")]
    Transport(String),
    #[error("image host rejected the upload: {0}")]
    Rejected(String),
    #[error("{failed} of {total} image uploads failed")]
    Partial { failed: usize, total: usize },
}

/// Remote image hosting backend
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Store the file at `path` remotely. Does not touch the local file.
    async fn upload(&self, path: &Path) -> Result<UploadedImage, UploadError>;

    /// Delete a previously uploaded asset
    async fn destroy(&self, public_id: &str) -> Result<(), UploadError>;
}

#[derive(Clone)]
pub struct ImageRelay {
    host: Arc<dyn ImageHost>,
}

impl ImageRelay {
    pub fn new(host: Arc<dyn ImageHost>) -> Self {
        Self { host }
    }

    /// Upload one staged file, then remove it locally on success and failure alike
    pub async fn upload(&self, path: &Path) -> Result<UploadedImage, UploadError> {
        let result = self.host.upload(path).await;
        remove_staged(path).await;

        match &result {
            Ok(image) => tracing::debug!(public_id = %image.public_id, "Image uploaded"),
            Err(e) => tracing::error!(path = %path.display(), "Image upload failed: {}", e),
        }
        result
    }

    /// Upload several staged files concurrently.
    ///
    /// All uploads are driven to completion so every temp file is cleaned up.
    /// When any of them fails the successful ones are deleted from the host
    /// and the whole batch is reported as failed.
    pub async fn upload_all(&self, paths: &[PathBuf]) -> Result<Vec<UploadedImage>, UploadError> {
        let results = join_all(paths.iter().map(|path| self.upload(path))).await;

        let total = results.len();
        let (uploaded, failures): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
        let uploaded: Vec<UploadedImage> = uploaded.into_iter().flatten().collect();

        if failures.is_empty() {
            return Ok(uploaded);
        }

        tracing::warn!(
            failed = failures.len(),
            total,
            "Image batch failed, discarding {} orphaned upload(s)",
            uploaded.len()
        );
        self.discard(&uploaded).await;
        Err(UploadError::Partial { failed: failures.len(), total })
    }

    /// Best-effort removal of remote assets nothing refers to anymore
    pub async fn discard(&self, images: &[UploadedImage]) {
        let results = join_all(images.iter().map(|image| self.host.destroy(&image.public_id))).await;
        for (image, result) in images.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(public_id = %image.public_id, "Failed to delete orphaned image: {}", e);
            }
        }
    }
}

/// Remove a staged file; a failure here is logged and otherwise ignored
pub async fn remove_staged(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), "Failed to remove staged upload: {}", e);
        }
    }
}
