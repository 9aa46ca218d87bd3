//! OpenAI chat-completions adapter.
//!
//! Tools are emitted as `{"type":"function","function":{name, description, parameters}}`
//! and a model's tool call is answered with a `role: "tool"` message.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{ToolConverter, ToolkitAdapter};
use crate::client::{RemoteToolClient, ToolDescriptor};
use crate::configuration::CallOptions;
use crate::error::ToolkitError;
use crate::schema::SchemaError;

/// Function definition inside a [`ChatCompletionTool`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments.
    pub parameters: Value,
}

/// Entry of the `tools` array of a chat-completions request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

/// Function name plus JSON-encoded arguments, as produced by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// One entry of an assistant message's `tool_calls`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

/// Reply to a tool call, appended to the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMessage {
    pub role: String,
    pub tool_call_id: String,
    pub content: String,
}

/// Maps descriptors to function tools: missing descriptions fall back to the
/// tool name, missing schemas to an empty object schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiConverter;

impl ToolConverter for OpenAiConverter {
    type Tools = Vec<ChatCompletionTool>;

    fn empty(&self) -> Self::Tools {
        Vec::new()
    }

    fn convert(&self, tools: Vec<ToolDescriptor>, _client: &Arc<RemoteToolClient>) -> Self::Tools {
        tools
            .into_iter()
            .map(|tool| ChatCompletionTool {
                kind: function_kind(),
                function: FunctionDefinition {
                    description: tool
                        .description
                        .filter(|d| !d.is_empty())
                        .unwrap_or_else(|| tool.name.clone()),
                    parameters: tool
                        .input_schema
                        .unwrap_or_else(|| json!({"type": "object", "properties": {}})),
                    name: tool.name,
                },
            })
            .collect()
    }
}

impl ToolkitAdapter<OpenAiConverter> {
    /// Executes the function named in `tool_call` and wraps the result as a tool message.
    ///
    /// Only functions in [`get_tools`](ToolkitAdapter::get_tools) are dispatched;
    /// any other name is [`ToolkitError::UnknownTool`].
    pub async fn handle_tool_call(
        &self,
        tool_call: &ChatCompletionToolCall,
    ) -> Result<ToolMessage, ToolkitError> {
        let name = &tool_call.function.name;
        if !self.get_tools()?.iter().any(|t| &t.function.name == name) {
            return Err(ToolkitError::UnknownTool(name.clone()));
        }
        let arguments = parse_arguments(name, &tool_call.function.arguments)?;
        let content = self
            .client()
            .call_tool(name, arguments, CallOptions::default())
            .await?;
        Ok(ToolMessage {
            role: "tool".to_string(),
            tool_call_id: tool_call.id.clone(),
            content,
        })
    }
}

/// Decodes the model's argument string; an empty string means no arguments.
fn parse_arguments(tool: &str, raw: &str) -> Result<Map<String, Value>, ToolkitError> {
    let invalid = |source| ToolkitError::InvalidArguments {
        tool: tool.to_string(),
        source,
    };
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(invalid(SchemaError::NotAnObject)),
        Err(e) => Err(invalid(SchemaError::Malformed(e.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_must_be_a_json_object() {
        assert!(parse_arguments("t", "").unwrap().is_empty());
        assert_eq!(
            parse_arguments("t", r#"{"limit":3}"#).unwrap()["limit"],
            json!(3)
        );
        assert!(matches!(
            parse_arguments("t", "[1]"),
            Err(ToolkitError::InvalidArguments {
                source: SchemaError::NotAnObject,
                ..
            })
        ));
        assert!(matches!(
            parse_arguments("t", "{not json"),
            Err(ToolkitError::InvalidArguments {
                source: SchemaError::Malformed(_),
                ..
            })
        ));
    }

    #[test]
    fn tool_call_deserializes_without_type() {
        let call: ChatCompletionToolCall = serde_json::from_value(json!({
            "id": "call_1",
            "function": {"name": "list_customers", "arguments": "{}"}
        }))
        .unwrap();
        assert_eq!(call.kind, "function");
    }

    #[test]
    fn tool_serializes_in_chat_completions_shape() {
        let tool = ChatCompletionTool {
            kind: function_kind(),
            function: FunctionDefinition {
                name: "list_customers".into(),
                description: "List customers".into(),
                parameters: json!({"type": "object"}),
            },
        };
        assert_eq!(
            serde_json::to_value(&tool).unwrap(),
            json!({
                "type": "function",
                "function": {
                    "name": "list_customers",
                    "description": "List customers",
                    "parameters": {"type": "object"}
                }
            })
        );
    }
}
