//! HTTP clients for the assistant widget and the triage service

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::types::{ChatReply, ChatRequest, TriageReply};
use crate::chat::ChatBackend;
use crate::types::{Result, XyraError};

fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| XyraError::Config(format!("failed to build HTTP client: {}", e)))
}

async fn post_message<T: serde::de::DeserializeOwned>(
    client: &Client,
    url: &str,
    message: &str,
) -> Result<T> {
    debug!("Chat -> {} ({} chars)", url, message.len());
    let response = client
        .post(url)
        .json(&ChatRequest {
            message: message.to_string(),
        })
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(XyraError::Connectivity(format!(
            "chat endpoint returned HTTP {}",
            response.status()
        )));
    }
    Ok(response.json().await?)
}

/// Assistant widget: `POST {backend}/api/chat/message`
pub struct WidgetChatClient {
    url: String,
    client: Client,
}

impl WidgetChatClient {
    pub fn new(backend_url: &str, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            url: format!("{}/api/chat/message", backend_url.trim_end_matches('/')),
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl ChatBackend for WidgetChatClient {
    async fn send(&self, message: &str) -> Result<Option<String>> {
        let reply: ChatReply = post_message(&self.client, &self.url, message).await?;
        Ok(reply.response)
    }
}

/// Symptom triage: `POST {triage}/chat`
pub struct TriageClient {
    url: String,
    client: Client,
}

impl TriageClient {
    pub fn new(triage_url: &str, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            url: format!("{}/chat", triage_url.trim_end_matches('/')),
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl ChatBackend for TriageClient {
    async fn send(&self, message: &str) -> Result<Option<String>> {
        let reply: TriageReply = post_message(&self.client, &self.url, message).await?;
        if let Some(level) = &reply.triage_level {
            debug!("Triage level: {}", level);
        }
        Ok(reply.answer)
    }
}
