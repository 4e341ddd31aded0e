use optimonkey_domain::{ChatCompletionMessage, ToolCallFull};
use serde::Deserialize;
use serde_json::Value;

use crate::repair;
use crate::{Error, Result};

/// Wire shape of an Azure OpenAI chat-completions response.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: Option<String>,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

impl Response {
    pub fn into_completion(self) -> Result<ChatCompletionMessage> {
        let choice = self.choices.into_iter().next().ok_or(Error::EmptyResponse)?;
        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|call| {
                let arguments = decode_arguments(&call.function.arguments);
                ToolCallFull {
                    name: call.function.name,
                    arguments,
                    call_id: call.id,
                }
            })
            .collect();
        Ok(ChatCompletionMessage { content: choice.message.content, tool_calls })
    }
}

/// Tool-call arguments arrive as a JSON-encoded string; models occasionally
/// mangle them, so decoding is lenient. Undecodable arguments are kept as the
/// raw string so the tool layer can report them.
fn decode_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    repair::from_str::<Value>(raw).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Undecodable tool-call arguments");
        Value::String(raw.to_string())
    })
}
