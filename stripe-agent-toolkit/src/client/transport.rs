//! Transport seam between `RemoteToolClient` and the remote MCP service.
//!
//! The client only needs four operations: handshake, catalog fetch, tool call and
//! close. [`McpTransport`] abstracts them so the client can be driven by the
//! Streamable HTTP transport in production and by an in-memory fake in tests.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TransportError;

/// Where to connect and which headers go on every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl Endpoint {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(k, v)| {
                if k.eq_ignore_ascii_case("authorization") {
                    (k.as_str(), "<redacted>")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("Endpoint")
            .field("url", &self.url)
            .field("headers", &headers)
            .finish()
    }
}

/// One entry of the remote tool catalog, as returned by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Raw JSON Schema for the arguments; absent when the server omits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

/// One item of a `tools/call` result's `content` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Remaining fields of non-text blocks (images, resources).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: Some(text.into()),
            extra: Map::new(),
        }
    }

    /// The text payload when this is a `text` block.
    pub fn as_text(&self) -> Option<&str> {
        if self.kind == "text" {
            self.text.as_deref()
        } else {
            None
        }
    }
}

/// Result of `tools/call`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

impl CallToolResult {
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(ContentBlock::as_text)
    }
}

/// An MCP session with the remote tool service.
///
/// **Interaction**: Created by a [`TransportFactory`] on every `connect` attempt;
/// owned by `RemoteToolClient` once the handshake and catalog fetch succeed.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Protocol handshake. Must complete before any other call.
    async fn initialize(&self) -> Result<(), TransportError>;

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, TransportError>;

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, TransportError>;

    /// Ends the session. Errors are reported but the transport is unusable afterwards either way.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Builds a fresh transport for each connection attempt.
pub trait TransportFactory: Send + Sync {
    fn create(&self, endpoint: &Endpoint) -> Result<Arc<dyn McpTransport>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptor_reads_camel_case_input_schema() {
        let d: ToolDescriptor = serde_json::from_value(json!({
            "name": "list_customers",
            "inputSchema": {"type": "object"}
        }))
        .unwrap();
        assert_eq!(d.name, "list_customers");
        assert_eq!(d.description, None);
        assert_eq!(d.input_schema, Some(json!({"type": "object"})));
    }

    #[test]
    fn call_result_keeps_non_text_blocks_and_error_flag() {
        let r: CallToolResult = serde_json::from_value(json!({
            "content": [
                {"type": "image", "data": "aGk=", "mimeType": "image/png"},
                {"type": "text", "text": "second"}
            ],
            "isError": true
        }))
        .unwrap();
        assert!(r.is_error);
        assert_eq!(r.first_text(), Some("second"));
        assert_eq!(r.content[0].extra["mimeType"], json!("image/png"));

        let back = serde_json::to_value(&r).unwrap();
        assert_eq!(back["content"][0]["data"], json!("aGk="));
        assert_eq!(back["isError"], json!(true));
    }

    #[test]
    fn endpoint_debug_redacts_authorization() {
        let e = Endpoint {
            url: "https://mcp.example.test".into(),
            headers: vec![
                ("Authorization".into(), "Bearer rk_test_secret".into()),
                ("User-Agent".into(), "ua".into()),
            ],
        };
        let rendered = format!("{:?}", e);
        assert!(!rendered.contains("rk_test_secret"), "{}", rendered);
        assert_eq!(e.header("user-agent"), Some("ua"));
    }
}
