//! Notification channel
//!
//! Workflows publish [`Notice`]s here instead of interrupting the user.
//! Live subscribers get them through a broadcast channel; a bounded history
//! is kept for callers that poll (the gateway's `/notices` route).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::error::{ErrorCategory, XyraError};

const CHANNEL_CAPACITY: usize = 64;
const DEFAULT_HISTORY: usize = 50;

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// One user-facing notification
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub level: NoticeLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_address: Option<String>,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            category: None,
            message: message.into(),
            content_address: None,
            at: Utc::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            ..Self::info(message)
        }
    }

    /// Error notice carrying the error's category and user message
    pub fn from_error(err: &XyraError) -> Self {
        Self {
            level: NoticeLevel::Error,
            category: Some(err.category()),
            message: err.user_message(),
            content_address: err.content_address().map(str::to_string),
            at: Utc::now(),
        }
    }
}

/// Fan-out publisher with bounded history
pub struct Notifier {
    sender: broadcast::Sender<Notice>,
    history: Mutex<VecDeque<Notice>>,
    max_history: usize,
}

impl Notifier {
    /// History keeps at least one notice
    pub fn new(max_history: usize) -> Self {
        let max_history = max_history.max(1);
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            history: Mutex::new(VecDeque::with_capacity(max_history)),
            max_history,
        }
    }

    /// Subscribe to notices published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    pub fn publish(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => warn!("Notice: {}", notice.message),
            _ => info!("Notice: {}", notice.message),
        }

        if let Ok(mut history) = self.history.lock() {
            while history.len() >= self.max_history {
                history.pop_front();
            }
            history.push_back(notice.clone());
        }

        // No receivers is fine; history still has it
        let _ = self.sender.send(notice);
    }

    /// Publish an error notice and hand the error back for `?` chaining
    pub fn report(&self, err: XyraError) -> XyraError {
        self.publish(Notice::from_error(&err));
        err
    }

    /// Snapshot of recent notices, oldest first
    pub fn history(&self) -> Vec<Notice> {
        self.history
            .lock()
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}
