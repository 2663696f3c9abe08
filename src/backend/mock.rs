//! Mock analysis backend for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::client::AnalysisBackend;
use super::types::{ReportRequest, ReportResponse, UploadResponse, SUCCESS_STATUS};
use crate::analysis::ImageFile;
use crate::types::{Result, XyraError};

/// CID returned by default from `generate_report`
pub const MOCK_REPORT_CID: &str = "bafkreihogjzmd3ewzyrpe3ibx3s7cbo7w7r3u2f4cv5skj6v53xpqxrqxa";

/// Backend with canned responses and call counters
pub struct MockBackend {
    base_url: String,
    upload_response: UploadResponse,
    report_response: ReportResponse,
    upload_delay: Option<Duration>,
    unreachable: AtomicBool,
    upload_calls: AtomicU32,
    report_calls: AtomicU32,
    last_report: Mutex<Option<ReportRequest>>,
}

impl MockBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            upload_response: UploadResponse {
                status: SUCCESS_STATUS.to_string(),
                diagnosis: Some("PNEUMONIA".to_string()),
                confidence: Some(0.9512),
                heatmap: Some("uploads/heatmap_xray.png".to_string()),
                message: None,
            },
            report_response: ReportResponse {
                status: SUCCESS_STATUS.to_string(),
                cid: Some(MOCK_REPORT_CID.to_string()),
                message: None,
            },
            upload_delay: None,
            unreachable: AtomicBool::new(false),
            upload_calls: AtomicU32::new(0),
            report_calls: AtomicU32::new(0),
            last_report: Mutex::new(None),
        }
    }

    /// Set the upload response
    pub fn with_upload_response(mut self, response: UploadResponse) -> Self {
        self.upload_response = response;
        self
    }

    /// Set the generate-report response
    pub fn with_report_response(mut self, response: ReportResponse) -> Self {
        self.report_response = response;
        self
    }

    /// Delay every upload
    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = Some(delay);
        self
    }

    /// Fail every call as if the server were down
    pub fn with_unreachable(self, unreachable: bool) -> Self {
        self.unreachable.store(unreachable, Ordering::SeqCst);
        self
    }

    pub fn upload_calls(&self) -> u32 {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn report_calls(&self) -> u32 {
        self.report_calls.load(Ordering::SeqCst)
    }

    /// Last generate-report request received
    pub fn last_report_request(&self) -> Option<ReportRequest> {
        self.last_report.lock().ok().and_then(|r| r.clone())
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(XyraError::Connectivity("connection refused".to_string()));
        }
        Ok(())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new("http://localhost:5000")
    }
}

#[async_trait]
impl AnalysisBackend for MockBackend {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn upload(&self, _image: &ImageFile) -> Result<UploadResponse> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.upload_delay {
            tokio::time::sleep(delay).await;
        }
        self.check_reachable()?;
        Ok(self.upload_response.clone())
    }

    async fn generate_report(&self, request: &ReportRequest) -> Result<ReportResponse> {
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_report.lock() {
            *last = Some(request.clone());
        }
        self.check_reachable()?;
        Ok(self.report_response.clone())
    }
}
