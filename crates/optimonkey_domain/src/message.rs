use chrono::Local;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Marker assistant agents emit when the task is done. Matching free-form
/// model output is inherently best-effort; the relay also terminates on the
/// final-recommendations message and on idle timeout.
pub const TERMINATION_MARKER: &str = "TERMINATE";

/// Speaker category of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Agent,
}

/// Rendering hint for the client: how the message content should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Error,
    ConfidenceScore,
    FinalRecommendations,
    Csv,
}

/// One record of the conversation stream. Produced incrementally by the chat
/// loop, forwarded to transports without further mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub content: String,
    pub role: ChatRole,
    pub name: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

impl ConversationMessage {
    pub fn new(
        role: ChatRole,
        name: impl Into<String>,
        content: impl Into<String>,
        kind: MessageKind,
    ) -> Self {
        Self {
            content: content.into(),
            role,
            name: name.into(),
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            kind,
        }
    }

    pub fn text(role: ChatRole, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(role, name, content, MessageKind::Text)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, "Error", content, MessageKind::Error)
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    pub fn is_termination(&self) -> bool {
        self.content.contains(TERMINATION_MARKER)
            || self.kind == MessageKind::FinalRecommendations
    }
}
