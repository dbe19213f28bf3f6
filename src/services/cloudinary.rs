//! Cloudinary image host
//!
//! Signed calls to the Cloudinary upload API. Request signatures are the SHA-1
//! of the alphabetically sorted, `&`-joined parameters followed by the API secret.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use ring::digest::{SHA1_FOR_LEGACY_USE_ONLY, digest};
use serde::Deserialize;
use std::fmt::Write;
use std::path::Path;

use crate::config::CloudinaryConfig;
use crate::services::image_relay::{ImageHost, UploadError, UploadedImage};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

pub struct CloudinaryClient {
    http: reqwest::Client,
    config: CloudinaryConfig,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    public_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let base_url = format!("{API_BASE}/{}/image", config.cloud_name);
        Ok(Self { http, config, base_url })
    }

    /// Sign `params` (already sorted by key) with the API secret
    fn sign(&self, params: &[(&str, &str)]) -> String {
        sign_params(params, &self.config.api_secret)
    }

    async fn rejected(response: reqwest::Response) -> UploadError {
        let status = response.status();
        match response.json::<ErrorResponse>().await {
            Ok(body) => UploadError::Rejected(format!("{status}: {}", body.error.message)),
            Err(_) => UploadError::Rejected(status.to_string()),
        }
    }
}

pub(crate) fn sign_params(params: &[(&str, &str)], secret: &str) -> String {
    let mut to_sign = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    to_sign.push_str(secret);

    let hash = digest(&SHA1_FOR_LEGACY_USE_ONLY, to_sign.as_bytes());
    hash.as_ref().iter().fold(String::with_capacity(40), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

#[async_trait]
impl ImageHost for CloudinaryClient {
    async fn upload(&self, path: &Path) -> Result<UploadedImage, UploadError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| UploadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[("timestamp", timestamp.as_str())]);

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature);

        let response = self
            .http
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        match (body.secure_url, body.public_id) {
            (Some(url), Some(public_id)) => Ok(UploadedImage { url, public_id }),
            _ => Err(UploadError::Rejected("response carried no secure_url".to_string())),
        }
    }

    async fn destroy(&self, public_id: &str) -> Result<(), UploadError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[("public_id", public_id), ("timestamp", timestamp.as_str())]);

        let response = self
            .http
            .post(format!("{}/destroy", self.base_url))
            .form(&[
                ("public_id", public_id),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.config.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        match body.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(UploadError::Rejected(format!("destroy returned `{other}`"))),
        }
    }
}
