use derive_setters::Setters;
use serde::{Deserialize, Serialize};

use crate::{ChatRole, ToolCallFull, ToolDefinition};

/// One message in the model-facing chat context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ContextMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into(), name: None }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into(), name: None }
    }

    pub fn assistant(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            name: Some(name.into()),
        }
    }
}

/// Full request context sent to the completion endpoint.
#[derive(Debug, Clone, Default, PartialEq, Setters, Serialize, Deserialize)]
#[setters(into, strip_option)]
pub struct Context {
    pub messages: Vec<ContextMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Context {
    pub fn add_message(mut self, message: ContextMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn extend_messages(mut self, messages: impl IntoIterator<Item = ContextMessage>) -> Self {
        self.messages.extend(messages);
        self
    }
}

/// Completion produced by the provider for one turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatCompletionMessage {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallFull>,
}

impl ChatCompletionMessage {
    pub fn content_or_default(&self) -> String {
        self.content.clone().unwrap_or_default()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_context_builds_in_order() {
        let actual = Context::default()
            .add_message(ContextMessage::system("sys"))
            .add_message(ContextMessage::user("hello"))
            .add_message(ContextMessage::assistant("Planner", "plan"));
        let roles: Vec<ChatRole> = actual.messages.iter().map(|m| m.role).collect();
        let expected = vec![ChatRole::System, ChatRole::User, ChatRole::Assistant];
        assert_eq!(roles, expected);
    }

    #[test]
    fn test_assistant_message_carries_name() {
        let actual = ContextMessage::assistant("Critic", "score 7");
        assert_eq!(actual.name.as_deref(), Some("Critic"));
    }
}
