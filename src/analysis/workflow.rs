//! The analysis workflow: file selection, upload, result.
//!
//! State lives behind an async mutex that is never held across the backend
//! call. Each submit and each reset advances a fencing token; a response
//! whose token is no longer current is discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::image::ImageFile;
use super::result::{normalize_heatmap, AnalysisResult, Confidence, Diagnosis};
use super::state::{AnalysisSnapshot, AnalysisState};
use crate::backend::{AnalysisBackend, UploadResponse};
use crate::types::{Notice, Notifier, Result, XyraError};

struct Inner {
    state: AnalysisState,
    token: u64,
}

pub struct AnalysisWorkflow {
    backend: Arc<dyn AnalysisBackend>,
    notifier: Arc<Notifier>,
    inner: Mutex<Inner>,
    minting: AtomicBool,
}

impl AnalysisWorkflow {
    pub fn new(backend: Arc<dyn AnalysisBackend>, notifier: Arc<Notifier>) -> Self {
        Self {
            backend,
            notifier,
            inner: Mutex::new(Inner {
                state: AnalysisState::default(),
                token: 0,
            }),
            minting: AtomicBool::new(false),
        }
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    pub fn backend(&self) -> &Arc<dyn AnalysisBackend> {
        &self.backend
    }

    /// Select an image. Non-images are rejected without touching state.
    pub async fn select_file(&self, file: ImageFile) -> Result<()> {
        if let Err(e) = file.validate() {
            return Err(self.notifier.report(e));
        }
        let mut inner = self.inner.lock().await;
        if let Err(e) = inner.state.select_file(file) {
            return Err(self.notifier.report(e));
        }
        debug!("File selected: {:?}", inner.state.file().map(|f| &f.name));
        Ok(())
    }

    pub async fn clear_file(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.state.clear_file().map_err(|e| self.notifier.report(e))
    }

    /// Submit the selected file and wait for the single inference response
    pub async fn start_analysis(&self) -> Result<AnalysisResult> {
        let (file, token) = {
            let mut inner = self.inner.lock().await;
            let file = inner
                .state
                .begin_upload()
                .map_err(|e| self.notifier.report(e))?;
            inner.token += 1;
            // Upload and inference share one request
            inner
                .state
                .begin_processing()
                .map_err(|e| self.notifier.report(e))?;
            (file, inner.token)
        };

        info!("Analysis {} started for {}", token, file.name);
        let response = self.backend.upload(&file).await;

        let mut inner = self.inner.lock().await;
        if inner.token != token {
            warn!("Discarding response for analysis {} (current {})", token, inner.token);
            return Err(self.notifier.report(XyraError::Stale { token }));
        }

        let outcome = response.and_then(|r| self.interpret(r));
        match outcome {
            Ok(result) => {
                inner
                    .state
                    .complete(result.clone())
                    .map_err(|e| self.notifier.report(e))?;
                info!(
                    "Analysis {} complete: {} ({}%)",
                    token, result.diagnosis, result.confidence
                );
                self.notifier.publish(Notice::success(format!(
                    "Analysis complete: {} ({}%)",
                    result.diagnosis, result.confidence
                )));
                Ok(result)
            }
            Err(e) => {
                inner.state.fail();
                warn!("Analysis {} failed: {}", token, e);
                Err(self.notifier.report(e))
            }
        }
    }

    fn interpret(&self, response: UploadResponse) -> Result<AnalysisResult> {
        if !response.is_success() {
            return Err(XyraError::Backend(response.failure_message()));
        }
        let missing = |field: &str| XyraError::Backend(format!("response is missing '{}'", field));

        let diagnosis = response.diagnosis.ok_or_else(|| missing("diagnosis"))?;
        let confidence = response.confidence.ok_or_else(|| missing("confidence"))?;
        let heatmap = response.heatmap.ok_or_else(|| missing("heatmap"))?;

        Ok(AnalysisResult {
            diagnosis: Diagnosis::from(diagnosis),
            confidence: Confidence::from_fraction(confidence),
            heatmap: normalize_heatmap(&heatmap, self.backend.base_url()),
        })
    }

    /// Return to `Idle` with no file and invalidate any in-flight request
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.token += 1;
        inner.state.reset();
        debug!("Workflow reset (token {})", inner.token);
    }

    pub async fn status(&self) -> &'static str {
        self.inner.lock().await.state.name()
    }

    pub async fn result(&self) -> Option<AnalysisResult> {
        self.inner.lock().await.state.result().cloned()
    }

    pub async fn file(&self) -> Option<ImageFile> {
        self.inner.lock().await.state.file().cloned()
    }

    pub async fn snapshot(&self) -> AnalysisSnapshot {
        self.inner.lock().await.state.snapshot()
    }

    /// Result and file of a completed analysis, for report and mint
    pub async fn completed(&self, action: &str) -> Result<(AnalysisResult, ImageFile)> {
        let inner = self.inner.lock().await;
        match &inner.state {
            AnalysisState::Complete { file, result } => Ok((result.clone(), file.clone())),
            other => Err(XyraError::transition(other.name(), action)),
        }
    }

    /// Claim the single mint slot; released when the guard drops
    pub fn begin_mint(&self) -> Result<MintGuard<'_>> {
        if self
            .minting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(XyraError::transition("minting", "mint"));
        }
        Ok(MintGuard {
            flag: &self.minting,
        })
    }
}

/// Held for the duration of one mint
pub struct MintGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for MintGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;

    fn image() -> ImageFile {
        ImageFile::new("scan.png", "image/png", vec![1u8, 2, 3]).unwrap()
    }

    fn workflow(backend: MockBackend) -> (AnalysisWorkflow, Arc<MockBackend>) {
        let backend = Arc::new(backend);
        let wf = AnalysisWorkflow::new(backend.clone(), Arc::new(Notifier::default()));
        (wf, backend)
    }

    #[tokio::test]
    async fn test_success_completes() {
        let (wf, backend) = workflow(MockBackend::default());
        wf.select_file(image()).await.unwrap();

        let result = wf.start_analysis().await.unwrap();
        assert_eq!(result.diagnosis, Diagnosis::Pneumonia);
        assert_eq!(result.confidence.percent(), 95.12);
        assert_eq!(result.heatmap, "http://localhost:5000/uploads/heatmap_xray.png");
        assert_eq!(wf.status().await, "complete");
        assert_eq!(backend.upload_calls(), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_returns_to_idle_with_file() {
        let (wf, _) = workflow(MockBackend::default().with_upload_response(UploadResponse {
            status: "error".to_string(),
            message: Some("Model not loaded".to_string()),
            ..Default::default()
        }));
        wf.select_file(image()).await.unwrap();

        let err = wf.start_analysis().await.unwrap_err();
        assert_eq!(err.user_message(), "Analysis failed: Model not loaded");
        assert_eq!(wf.status().await, "idle");
        assert_eq!(wf.file().await, Some(image()));
    }

    #[tokio::test]
    async fn test_connectivity_failure_is_reported() {
        let (wf, _) = workflow(MockBackend::default().with_unreachable(true));
        let mut notices = wf.notifier().subscribe();
        wf.select_file(image()).await.unwrap();

        assert!(matches!(
            wf.start_analysis().await,
            Err(XyraError::Connectivity(_))
        ));
        let notice = notices.recv().await.unwrap();
        assert_eq!(notice.message, "Error connecting to analysis server.");
        assert_eq!(wf.status().await, "idle");
    }

    #[tokio::test]
    async fn test_non_image_never_calls_backend() {
        let (wf, backend) = workflow(MockBackend::default());
        let text = ImageFile {
            name: "notes.txt".to_string(),
            mime: "text/plain".to_string(),
            bytes: bytes::Bytes::from_static(b"hi"),
        };
        assert!(matches!(
            wf.select_file(text).await,
            Err(XyraError::Validation(_))
        ));
        assert!(wf.start_analysis().await.is_err());
        assert_eq!(backend.upload_calls(), 0);
        assert_eq!(wf.status().await, "idle");
    }

    #[tokio::test]
    async fn test_mint_slot_is_exclusive() {
        let (wf, _) = workflow(MockBackend::default());
        let guard = wf.begin_mint().unwrap();
        assert!(wf.begin_mint().is_err());
        drop(guard);
        assert!(wf.begin_mint().is_ok());
    }

    #[tokio::test]
    async fn test_completed_requires_complete_state() {
        let (wf, _) = workflow(MockBackend::default());
        assert!(matches!(
            wf.completed("mint").await,
            Err(XyraError::InvalidTransition { .. })
        ));
    }
}
