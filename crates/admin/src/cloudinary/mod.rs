//! Cloudinary upload API client for the hosted image store.
//!
//! Uses the unsigned upload endpoint: a multipart POST carrying the file and
//! an upload preset, no credentials. The preset (configured in the Cloudinary
//! console) controls what the gateway accepts; the returned `secure_url` is
//! publicly fetchable.
//!
//! # API Reference
//!
//! - Base URL: `https://api.cloudinary.com/v1_1`
//! - Endpoint: `POST /{cloud_name}/image/upload`

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use crate::config::CloudinaryConfig;

/// Cloudinary API base URL.
const BASE_URL: &str = "https://api.cloudinary.com/v1_1";

/// Errors that can occur when interacting with the Cloudinary API.
#[derive(Debug, Error)]
pub enum CloudinaryError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Unauthorized (unknown cloud or disabled preset).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Failed to parse a response or build the request.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result of a successful upload. The gateway reports far more (dimensions,
/// format, byte size); only what the panel uses is kept.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedImage {
    /// Publicly fetchable HTTPS URL of the stored file.
    pub secure_url: String,
    /// Gateway-assigned identifier.
    pub public_id: String,
}

/// Cloudinary upload API client.
#[derive(Clone)]
pub struct CloudinaryClient {
    inner: Arc<CloudinaryClientInner>,
}

struct CloudinaryClientInner {
    client: reqwest::Client,
    cloud_name: String,
    upload_preset: String,
}

impl CloudinaryClient {
    /// Create a new Cloudinary client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &CloudinaryConfig) -> Result<Self, CloudinaryError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            inner: Arc::new(CloudinaryClientInner {
                client,
                cloud_name: config.cloud_name.clone(),
                upload_preset: config.upload_preset.clone(),
            }),
        })
    }

    /// Upload a file and return the gateway's record of it.
    ///
    /// The gateway performs its own validation (size and format limits live
    /// in the upload preset).
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is rejected or the request fails.
    #[instrument(skip(self, data), fields(filename = %filename, bytes = data.len()))]
    pub async fn upload_image(
        &self,
        data: Vec<u8>,
        filename: &str,
    ) -> Result<UploadedImage, CloudinaryError> {
        let mime = mime_guess::from_path(filename).first_or_octet_stream();
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str(mime.as_ref())
            .map_err(|e| CloudinaryError::Parse(format!("invalid content type: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .text("upload_preset", self.inner.upload_preset.clone())
            .part("file", part);

        let response = self
            .inner
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &body));
        }

        response
            .json()
            .await
            .map_err(|e| CloudinaryError::Parse(format!("failed to parse response: {e}")))
    }

    fn upload_url(&self) -> String {
        format!("{BASE_URL}/{}/image/upload", self.inner.cloud_name)
    }
}

impl std::fmt::Debug for CloudinaryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryClient")
            .field("cloud_name", &self.inner.cloud_name)
            .field("upload_preset", &self.inner.upload_preset)
            .finish_non_exhaustive()
    }
}

fn classify_error(status: u16, body: &str) -> CloudinaryError {
    let message =
        parse_error_message(body).unwrap_or_else(|| format!("status {status} with no detail"));

    match status {
        401 | 403 => CloudinaryError::Unauthorized(message),
        _ => CloudinaryError::Api { status, message },
    }
}

/// Pull the message out of a `{"error": {"message": "..."}}` body.
fn parse_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorMessage,
    }
    #[derive(Deserialize)]
    struct ErrorMessage {
        message: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.error.message)
}
