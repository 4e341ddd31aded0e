use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declaration of a callable exposed to the coder agent. `parameters` is a
/// JSON-schema fragment in the OpenAI function-calling shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self { name: name.into(), description: description.into(), parameters }
    }
}

/// A tool invocation requested by the model, with decoded arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallFull {
    pub name: String,
    pub arguments: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

impl ToolCallFull {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self { name: name.into(), arguments, call_id: None }
    }
}

/// Outcome of executing one tool call, fed back into the chat transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub name: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self { name: name.into(), content: content.into(), is_error: false }
    }

    pub fn failure(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self { name: name.into(), content: content.into(), is_error: true }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_tool_call_skips_missing_call_id() {
        let fixture = ToolCallFull::new("run_kusto_query", json!({"query": "Resources"}));
        let actual = serde_json::to_value(&fixture).unwrap();
        assert_eq!(actual.get("call_id"), None);
        assert_eq!(actual["name"], json!("run_kusto_query"));
    }

    #[test]
    fn test_tool_result_flags() {
        assert!(!ToolResult::success("t", "ok").is_error);
        assert!(ToolResult::failure("t", "nope").is_error);
    }
}
