use optimonkey_domain::{ChatRole, Context, ContextMessage, ToolDefinition};
use serde::Serialize;
use serde_json::Value;

/// Wire shape of an Azure OpenAI chat-completions request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Request {
    pub messages: Vec<RequestMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestMessage {
    pub role: &'static str,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: ToolFunction,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self { kind: "json_object" }
    }
}

// The completions API only knows system/user/assistant; our "agent" role
// (proxy agents relaying tool output) maps onto assistant.
fn wire_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant | ChatRole::Agent => "assistant",
    }
}

impl From<&ContextMessage> for RequestMessage {
    fn from(message: &ContextMessage) -> Self {
        Self {
            role: wire_role(message.role),
            content: message.content.clone(),
            name: message.name.clone(),
        }
    }
}

impl From<&ToolDefinition> for Tool {
    fn from(def: &ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: ToolFunction {
                name: def.name.clone(),
                description: def.description.clone(),
                parameters: def.parameters.clone(),
            },
        }
    }
}

impl From<&Context> for Request {
    fn from(context: &Context) -> Self {
        Self {
            messages: context.messages.iter().map(RequestMessage::from).collect(),
            temperature: context.temperature,
            tools: context.tools.iter().map(Tool::from).collect(),
            response_format: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use optimonkey_domain::ContextMessage;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_agent_role_maps_to_assistant() {
        let fixture = ContextMessage {
            role: ChatRole::Agent,
            content: "rows: []".to_string(),
            name: Some("Executor".to_string()),
        };
        let actual = RequestMessage::from(&fixture);
        assert_eq!(actual.role, "assistant");
        assert_eq!(actual.name.as_deref(), Some("Executor"));
    }

    #[test]
    fn test_empty_tools_not_serialized() {
        let context = Context::default().add_message(ContextMessage::user("hi"));
        let request = Request::from(&context);
        let actual = serde_json::to_value(&request).unwrap();
        assert_eq!(actual.get("tools"), None);
        assert_eq!(actual.get("response_format"), None);
    }

    #[test]
    fn test_tool_definition_wire_shape() {
        let fixture = ToolDefinition::new(
            "run_kusto_query",
            "Run a KQL query via Azure Resource Graph.",
            json!({"type": "object", "properties": {"query": {"type": "string"}}}),
        );
        let actual = serde_json::to_value(Tool::from(&fixture)).unwrap();
        assert_eq!(actual["type"], json!("function"));
        assert_eq!(actual["function"]["name"], json!("run_kusto_query"));
        assert_eq!(
            actual["function"]["parameters"]["type"],
            json!("object")
        );
    }

    #[test]
    fn test_response_format_json_object() {
        let actual = serde_json::to_value(ResponseFormat::json_object()).unwrap();
        assert_eq!(actual, json!({"type": "json_object"}));
    }
}
