//! Downloadable PDF report of an analysis.
//!
//! Images are fetched and decoded at generation time. Any image that fails
//! gets a placeholder; the document is always produced.

pub mod layout;
pub mod pdf;

use base64::Engine;
use chrono::Utc;
use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::analysis::{AnalysisResult, ImageFile};
use crate::types::{Result, XyraError};
use layout::ReportContext;

/// Multicodec code for raw bytes
const RAW_CODEC: u64 = 0x55;

/// A rendered report
#[derive(Debug, Clone)]
pub struct Report {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// CIDv1 (raw, sha2-256) of `bytes`
    pub cid: String,
}

pub struct ReportGenerator {
    client: Client,
}

impl ReportGenerator {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| XyraError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub async fn generate(
        &self,
        result: &AnalysisResult,
        original: &ImageFile,
        account: Option<&str>,
    ) -> Result<Report> {
        let original_image = match pdf::decode_image(&original.bytes) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("Original image not embedded: {}", e);
                None
            }
        };

        let heatmap_image = match self.fetch_image(&result.heatmap).await {
            Ok(bytes) => match pdf::decode_image(&bytes) {
                Ok(image) => Some(image),
                Err(e) => {
                    warn!("Heatmap not embedded: {}", e);
                    None
                }
            },
            Err(e) => {
                warn!("Heatmap not fetched from {}: {}", result.heatmap, e);
                None
            }
        };

        let generated_at = Utc::now();
        let analysis_id = generated_at.timestamp_millis();
        let file_size_mb = original.size_mb();
        let ctx = ReportContext {
            result,
            file_name: &original.name,
            file_size_mb: &file_size_mb,
            account,
            generated_at,
            analysis_id,
            original_available: original_image.is_some(),
            heatmap_available: heatmap_image.is_some(),
        };
        let elements = layout::layout(&ctx);

        // printpdf is synchronous and CPU bound
        let bytes = tokio::task::spawn_blocking(move || {
            pdf::render(
                "XyraChain Medical AI Report",
                &elements,
                original_image.as_ref(),
                heatmap_image.as_ref(),
            )
        })
        .await
        .map_err(|e| XyraError::Internal(format!("report task failed: {}", e)))??;

        let report = Report {
            file_name: layout::file_name(analysis_id),
            cid: content_id(&bytes),
            bytes,
        };
        info!(
            "Report {} generated ({} bytes, {})",
            report.file_name,
            report.bytes.len(),
            report.cid
        );
        Ok(report)
    }

    /// Load an image locator: `data:` URLs inline, `http(s)` via GET
    pub async fn fetch_image(&self, locator: &str) -> Result<Vec<u8>> {
        if let Some(rest) = locator.strip_prefix("data:") {
            return decode_data_url(rest);
        }
        if !(locator.starts_with("http://") || locator.starts_with("https://")) {
            return Err(XyraError::Validation(format!(
                "unsupported image locator: {}",
                locator
            )));
        }

        debug!("Fetching image {}", locator);
        let response = self.client.get(locator).send().await?;
        if !response.status().is_success() {
            return Err(XyraError::Connectivity(format!(
                "image fetch returned HTTP {}",
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Decode the part of a `data:` URL after the scheme
fn decode_data_url(rest: &str) -> Result<Vec<u8>> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| XyraError::Validation("malformed data URL".to_string()))?;
    if !meta.ends_with(";base64") {
        return Ok(payload.as_bytes().to_vec());
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| XyraError::Validation(format!("invalid base64 in data URL: {}", e)))
}

/// Raw-codec CIDv1 over sha2-256
pub fn content_id(bytes: &[u8]) -> String {
    let hash = Code::Sha2_256.digest(bytes);
    Cid::new_v1(RAW_CODEC, hash).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_known_value() {
        assert_eq!(
            content_id(b"hello world"),
            "bafkreifzjut3te2nhyekklss27nh3k72ysco7y32koao5eei66wof36n5e"
        );
    }

    #[test]
    fn test_decode_data_url() {
        assert_eq!(decode_data_url("image/png;base64,YWJj").unwrap(), b"abc");
        assert_eq!(decode_data_url("text/plain,hi").unwrap(), b"hi");
        assert!(decode_data_url("image/png;base64").is_err());
    }

    #[tokio::test]
    async fn test_unsupported_locator() {
        let generator = ReportGenerator::new(None).unwrap();
        assert!(generator.fetch_image("/tmp/heat.png").await.is_err());
        assert_eq!(
            generator.fetch_image("data:image/png;base64,YWJj").await.unwrap(),
            b"abc"
        );
    }
}
