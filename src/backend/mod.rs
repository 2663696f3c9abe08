//! Clients for the external backends: inference, report pinning and chat

pub mod chat;
pub mod client;
pub mod mock;
pub mod types;

pub use chat::{TriageClient, WidgetChatClient};
pub use client::{AnalysisBackend, HttpBackend};
pub use mock::MockBackend;
pub use types::{ReportRequest, ReportResponse, UploadResponse};
