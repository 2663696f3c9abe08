//! Wire types for the inference, report and chat backends

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;

pub const SUCCESS_STATUS: &str = "success";

/// `POST /api/analysis/upload` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    #[serde(default)]
    pub diagnosis: Option<String>,
    /// Fraction in `0..=1`
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub heatmap: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl UploadResponse {
    pub fn is_success(&self) -> bool {
        self.status == SUCCESS_STATUS
    }

    /// Message to surface for a failed upload
    pub fn failure_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format!("backend returned status '{}'", self.status))
    }
}

/// `POST /api/analysis/generate-report` request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub analysis_result: AnalysisResult,
    /// Always empty; the analysis page never attaches chat history
    pub chat_logs: Vec<serde_json::Value>,
    pub user_address: String,
}

impl ReportRequest {
    pub fn new(analysis_result: AnalysisResult, user_address: impl Into<String>) -> Self {
        Self {
            analysis_result,
            chat_logs: Vec::new(),
            user_address: user_address.into(),
        }
    }
}

/// `POST /api/analysis/generate-report` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportResponse {
    pub status: String,
    #[serde(default)]
    pub cid: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ReportResponse {
    pub fn is_success(&self) -> bool {
        self.status == SUCCESS_STATUS
    }
}

/// Request body shared by both chat endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// `POST /api/chat/message` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: Option<String>,
}

/// `POST /chat` response from the triage service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriageReply {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub triage_level: Option<String>,
}
