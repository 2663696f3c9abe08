//! HTTP client for the inference and report-pinning backend

use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{ReportRequest, ReportResponse, UploadResponse};
use crate::analysis::ImageFile;
use crate::types::{Result, XyraError};

/// Multipart field the upload endpoint reads the image from
pub const UPLOAD_FIELD: &str = "xray";

/// Operations the analysis workflow needs from the backend
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Base URL, used to resolve relative heat-map paths
    fn base_url(&self) -> &str;

    /// Submit an image for inference
    async fn upload(&self, image: &ImageFile) -> Result<UploadResponse>;

    /// Ask the backend to build and pin a report
    async fn generate_report(&self, request: &ReportRequest) -> Result<ReportResponse>;
}

pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    /// Create a client for `base_url`; no timeout unless one is given
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| XyraError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Shared single-shot client, also used for heat-map downloads
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn upload(&self, image: &ImageFile) -> Result<UploadResponse> {
        let url = format!("{}/api/analysis/upload", self.base_url);
        debug!("Uploading {} ({} bytes) to {}", image.name, image.bytes.len(), url);

        let part = multipart::Part::bytes(image.bytes.to_vec())
            .file_name(image.name.clone())
            .mime_str(&image.mime)
            .map_err(|e| XyraError::Validation(format!("invalid MIME type: {}", e)))?;
        let form = multipart::Form::new().part(UPLOAD_FIELD, part);

        let response = self.client.post(&url).multipart(form).send().await?;
        handle_payload(response).await
    }

    async fn generate_report(&self, request: &ReportRequest) -> Result<ReportResponse> {
        let url = format!("{}/api/analysis/generate-report", self.base_url);
        debug!("Requesting report pin for {}", request.user_address);

        let response = self.client.post(&url).json(request).send().await?;
        handle_payload(response).await
    }
}

/// Decode a `{status, message?}`-style payload.
///
/// A non-2xx response that still carries a decodable payload is returned as
/// is, so the caller reports the backend message; anything else is a
/// connectivity failure.
async fn handle_payload<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<T>(&body) {
        Ok(payload) => {
            warn!("Backend returned HTTP {} with payload", status);
            Ok(payload)
        }
        Err(_) => Err(XyraError::Connectivity(format!(
            "backend returned HTTP {}",
            status
        ))),
    }
}
