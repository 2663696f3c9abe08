//! One conversation with a chat backend

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::{Result, XyraError};

/// A conversational endpoint
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one message; `Ok(None)` when the reply carried no text
    async fn send(&self, message: &str) -> Result<Option<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub origin: Origin,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    fn new(origin: Origin, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            origin,
            body: body.into(),
            sent_at: Utc::now(),
        }
    }
}

/// Fixed texts for one kind of chat
#[derive(Debug, Clone, Copy)]
pub struct ChatScript {
    pub greeting: &'static str,
    pub empty_reply: &'static str,
    pub connection_error: &'static str,
}

pub const WIDGET_SCRIPT: ChatScript = ChatScript {
    greeting: "Hello! I am your AI Health Assistant. How can I help you today?",
    empty_reply: "I'm sorry, I couldn't process that.",
    connection_error:
        "Sorry, I'm having trouble connecting to the server. Please check if the backend is running.",
};

pub const TRIAGE_SCRIPT: ChatScript = ChatScript {
    greeting: "Hello. I have analyzed your scan. Based on the preliminary results, I need to ask a few questions to better understand your condition. Do you have a persistent cough?",
    empty_reply: "I'm having trouble processing that request.",
    connection_error: "Network error: Unable to reach the AI service. Ensure the backend is running.",
};

struct Transcript {
    messages: Vec<ChatMessage>,
    token: u64,
}

/// Append-only transcript plus the backend it talks to.
///
/// The user message is appended before the request goes out. Replies that
/// arrive after a `reset` are dropped. `in_flight` only changes while the
/// transcript lock is held.
pub struct ChatSession {
    backend: Arc<dyn ChatBackend>,
    script: ChatScript,
    transcript: Mutex<Transcript>,
    in_flight: AtomicUsize,
}

impl ChatSession {
    pub fn new(backend: Arc<dyn ChatBackend>, script: ChatScript) -> Self {
        Self {
            backend,
            script,
            transcript: Mutex::new(Transcript {
                messages: vec![ChatMessage::new(Origin::Assistant, script.greeting)],
                token: 0,
            }),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn widget(backend: Arc<dyn ChatBackend>) -> Self {
        Self::new(backend, WIDGET_SCRIPT)
    }

    pub fn triage(backend: Arc<dyn ChatBackend>) -> Self {
        Self::new(backend, TRIAGE_SCRIPT)
    }

    /// Send `input`. Blank input is ignored and returns `Ok(None)`;
    /// otherwise returns the assistant message that was appended.
    pub async fn send(&self, input: &str) -> Result<Option<ChatMessage>> {
        if input.trim().is_empty() {
            return Ok(None);
        }

        let token = {
            let mut transcript = self.transcript.lock().await;
            transcript.messages.push(ChatMessage::new(Origin::User, input));
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            transcript.token
        };

        let body = match self.backend.send(input).await {
            Ok(Some(reply)) => reply,
            Ok(None) => self.script.empty_reply.to_string(),
            Err(e) => {
                warn!("Chat request failed: {}", e);
                self.script.connection_error.to_string()
            }
        };

        let mut transcript = self.transcript.lock().await;
        if transcript.token != token {
            debug!("Dropping chat reply for reset transcript");
            return Err(XyraError::Stale { token });
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let reply = ChatMessage::new(Origin::Assistant, body);
        transcript.messages.push(reply.clone());
        Ok(Some(reply))
    }

    /// Back to just the greeting; in-flight replies are discarded
    pub async fn reset(&self) {
        let mut transcript = self.transcript.lock().await;
        transcript.token += 1;
        transcript.messages = vec![ChatMessage::new(Origin::Assistant, self.script.greeting)];
        self.in_flight.store(0, Ordering::SeqCst);
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.transcript.lock().await.messages.clone()
    }

    /// True while any request is awaiting its reply
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    struct Echo {
        calls: AtomicU32,
        reply: Option<String>,
        fail: bool,
    }

    impl Echo {
        fn new(reply: Option<&str>, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                reply: reply.map(str::to_string),
                fail,
            })
        }
    }

    #[async_trait]
    impl ChatBackend for Echo {
        async fn send(&self, _message: &str) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(XyraError::Connectivity("refused".to_string()));
            }
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn test_greeting_first() {
        let chat = ChatSession::widget(Echo::new(Some("hi"), false));
        let messages = chat.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, WIDGET_SCRIPT.greeting);
        assert_eq!(messages[0].origin, Origin::Assistant);
    }

    #[tokio::test]
    async fn test_blank_input_ignored() {
        let backend = Echo::new(Some("hi"), false);
        let chat = ChatSession::widget(backend.clone());
        assert!(chat.send("   \n\t").await.unwrap().is_none());
        assert_eq!(chat.messages().await.len(), 1);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exchange_appends_in_order() {
        let chat = ChatSession::widget(Echo::new(Some("Drink water."), false));
        let reply = chat.send("I have a cough").await.unwrap().unwrap();
        assert_eq!(reply.body, "Drink water.");

        let messages = chat.messages().await;
        let bodies: Vec<_> = messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies[1..], ["I have a cough", "Drink water."]);
        assert_eq!(messages[1].origin, Origin::User);
        assert!(!chat.is_loading());
    }

    #[tokio::test]
    async fn test_missing_reply_and_error_texts() {
        let chat = ChatSession::triage(Echo::new(None, false));
        let reply = chat.send("fever").await.unwrap().unwrap();
        assert_eq!(reply.body, TRIAGE_SCRIPT.empty_reply);

        let chat = ChatSession::triage(Echo::new(None, true));
        let reply = chat.send("fever").await.unwrap().unwrap();
        assert_eq!(reply.body, TRIAGE_SCRIPT.connection_error);
    }

    #[tokio::test]
    async fn test_reset_restores_greeting() {
        let chat = ChatSession::widget(Echo::new(Some("ok"), false));
        chat.send("hello").await.unwrap();
        chat.reset().await;
        let messages = chat.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, WIDGET_SCRIPT.greeting);
    }

    /// Holds every request until a permit is added
    struct Gate(Semaphore);

    #[async_trait]
    impl ChatBackend for Gate {
        async fn send(&self, message: &str) -> Result<Option<String>> {
            if let Ok(permit) = self.0.acquire().await {
                permit.forget();
            }
            Ok(Some(format!("re: {}", message)))
        }
    }

    async fn wait_for_messages(chat: &ChatSession, count: usize) {
        for _ in 0..200 {
            if chat.messages().await.len() == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("transcript never reached {} messages", count);
    }

    #[tokio::test]
    async fn test_loading_until_last_overlapping_reply() {
        let gate = Arc::new(Gate(Semaphore::new(0)));
        let chat = Arc::new(ChatSession::widget(gate.clone()));

        let first = tokio::spawn({
            let chat = chat.clone();
            async move { chat.send("first").await }
        });
        let second = tokio::spawn({
            let chat = chat.clone();
            async move { chat.send("second").await }
        });
        wait_for_messages(&chat, 3).await;
        assert!(chat.is_loading());

        gate.0.add_permits(1);
        wait_for_messages(&chat, 4).await;
        assert!(chat.is_loading());

        gate.0.add_permits(1);
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();
        assert_eq!(chat.messages().await.len(), 5);
        assert!(!chat.is_loading());
    }

    #[tokio::test]
    async fn test_reset_clears_loading() {
        let gate = Arc::new(Gate(Semaphore::new(0)));
        let chat = Arc::new(ChatSession::widget(gate.clone()));

        let pending = tokio::spawn({
            let chat = chat.clone();
            async move { chat.send("hello").await }
        });
        wait_for_messages(&chat, 2).await;
        assert!(chat.is_loading());

        chat.reset().await;
        assert!(!chat.is_loading());

        gate.0.add_permits(1);
        assert!(matches!(
            pending.await.unwrap(),
            Err(XyraError::Stale { .. })
        ));
        assert!(!chat.is_loading());
        assert_eq!(chat.messages().await.len(), 1);
    }
}
