//! Product forms
//!
//! Reads the text fields of a product form and stages every `productImages`
//! part on local disk for the image relay. Whenever the form is rejected,
//! whatever was already staged is removed again. A JSON body carries text
//! fields only.

use axum::Json;
use axum::extract::multipart::Field;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::{MAX_IMAGES_PER_PRODUCT, UploadConfig};
use crate::database::models::{ProductDraft, ProductFields, ProductPatch};
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;
use crate::services::image_relay::remove_staged;

/// Multipart field name carrying product images
pub const IMAGE_FIELD: &str = "productImages";

#[derive(Debug, Default)]
pub struct ProductForm {
    pub draft: ProductDraft,
    /// Staged image files in the order they were received
    pub images: Vec<PathBuf>,
}

impl ProductForm {
    /// Drain the multipart body into a form, staging image parts under `uploads.dir`
    pub async fn from_multipart(multipart: Multipart, uploads: &UploadConfig) -> ApiResult<Self> {
        let mut form = ProductForm::default();
        match form.read_parts(multipart, uploads).await {
            Ok(()) => Ok(form),
            Err(e) => {
                form.discard().await;
                Err(e)
            }
        }
    }

    async fn read_parts(&mut self, mut multipart: Multipart, uploads: &UploadConfig) -> ApiResult<()> {
        while let Some(field) = multipart.next_field().await.map_err(|e| {
            ApiError::validation(format!("Invalid multipart body: {}", e.body_text()))
        })? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                IMAGE_FIELD => self.stage(field, uploads).await?,
                "title" => self.draft.title = Some(read_text(field).await?),
                "price" => self.draft.price = Some(read_text(field).await?),
                "description" => self.draft.description = Some(read_text(field).await?),
                "links" => self.draft.links = Some(read_text(field).await?),
                "category" => self.draft.category = Some(read_text(field).await?),
                other => tracing::debug!("Ignoring unknown form field `{}`", other),
            }
        }
        Ok(())
    }

    async fn stage(&mut self, mut field: Field<'_>, uploads: &UploadConfig) -> ApiResult<()> {
        let original = field.file_name().unwrap_or_default().to_string();
        // Browsers send an empty, nameless part when no file was picked.
        if original.is_empty() {
            return Ok(());
        }

        let is_image = field
            .content_type()
            .is_some_and(|ct| ct.starts_with("image/"));
        if !is_image {
            return Err(ApiError::validation("Only image files are allowed!"));
        }
        if self.images.len() >= MAX_IMAGES_PER_PRODUCT {
            return Err(ApiError::validation(format!(
                "At most {MAX_IMAGES_PER_PRODUCT} images are allowed"
            )));
        }

        let path = uploads.dir.join(staged_name(&original));
        // Track before writing so a half-written file is cleaned up too.
        self.images.push(path.clone());

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| ApiError::Internal(anyhow::Error::new(e).context("Failed to stage upload")))?;

        let mut written = 0usize;
        while let Some(chunk) = field.chunk().await.map_err(|e| {
            ApiError::validation(format!("Invalid multipart body: {}", e.body_text()))
        })? {
            written += chunk.len();
            if written > uploads.max_image_bytes {
                return Err(ApiError::validation(format!(
                    "Each image must be at most {} bytes",
                    uploads.max_image_bytes
                )));
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| ApiError::Internal(anyhow::Error::new(e).context("Failed to stage upload")))?;
        }
        file.flush()
            .await
            .map_err(|e| ApiError::Internal(anyhow::Error::new(e).context("Failed to stage upload")))?;

        tracing::debug!(path = %path.display(), bytes = written, "Staged image");
        Ok(())
    }

    /// Remove every staged file
    pub async fn discard(self) {
        for path in &self.images {
            remove_staged(path).await;
        }
    }

    /// Validate a create request: all text fields and at least one image.
    /// Staged files are removed when validation fails.
    pub async fn into_new_product(self) -> ApiResult<(ProductFields, Vec<PathBuf>)> {
        let validated = self.draft.validate();
        match validated {
            Ok(fields) if !self.images.is_empty() => Ok((fields, self.images)),
            Ok(_) => {
                self.discard().await;
                Err(ApiError::validation("All fields and at least one image are required."))
            }
            Err(e) => {
                self.discard().await;
                Err(e.into())
            }
        }
    }

    /// Validate an update request; only supplied fields are checked.
    /// Staged files are removed when validation fails.
    pub async fn into_patch(self) -> ApiResult<(ProductPatch, Vec<PathBuf>)> {
        match self.draft.validate_patch() {
            Ok(patch) => Ok((patch, self.images)),
            Err(e) => {
                self.discard().await;
                Err(e.into())
            }
        }
    }
}

impl FromRequest<AppState> for ProductForm {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let Json(draft) = Json::<ProductDraft>::from_request(req, state).await?;
            return Ok(ProductForm { draft, images: Vec::new() });
        }

        let multipart = Multipart::from_request(req, state).await?;
        Self::from_multipart(multipart, &state.uploads).await
    }
}

async fn read_text(field: Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart body: {}", e.body_text())))
}

/// `<millis>-<uuid>-<name>` with anything outside `[A-Za-z0-9._-]` replaced
fn staged_name(original: &str) -> String {
    let base = Path::new(original)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sanitized: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .take(64)
        .collect();
    format!(
        "{}-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        sanitized
    )
}
