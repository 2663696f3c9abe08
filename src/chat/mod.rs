//! Assistant widget and symptom triage conversations

pub mod session;

pub use session::{
    ChatBackend, ChatMessage, ChatScript, ChatSession, Origin, TRIAGE_SCRIPT, WIDGET_SCRIPT,
};
