//! MCP proxy adapter: remote tools re-exposed on a local MCP server.
//!
//! Each [`ProxyTool`] carries the per-field [`FieldShape`] a server needs to
//! declare the tool, and forwards `tools/call` to the remote service. A
//! `customer` argument is sent as the per-call customer override.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::{ToolConverter, ToolkitAdapter};
use crate::client::{CallToolResult, ContentBlock, RemoteToolClient, ToolDescriptor};
use crate::configuration::CallOptions;
use crate::error::ToolkitError;
use crate::schema::{json_schema_to_object, FieldShape, ObjectSchema};

/// One remote tool as declared on the local server.
#[derive(Debug, Clone)]
pub struct ProxyTool {
    pub name: String,
    /// Remote description, or the tool name when it has none.
    pub description: String,
    schema: ObjectSchema,
    client: Arc<RemoteToolClient>,
}

impl ProxyTool {
    pub fn new(descriptor: ToolDescriptor, client: Arc<RemoteToolClient>) -> Self {
        let schema = json_schema_to_object(descriptor.input_schema.as_ref());
        let description = descriptor
            .description
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| descriptor.name.clone());
        Self {
            name: descriptor.name,
            description,
            schema,
            client,
        }
    }

    /// Per-field declarations for servers that register tools field by field.
    pub fn shape(&self) -> &FieldShape {
        self.schema.fields()
    }

    /// JSON Schema rendered from the shape, for the server's `tools/list`.
    pub fn input_schema(&self) -> Value {
        self.schema.to_json_schema()
    }

    /// Validates `args`, calls the remote tool and wraps the text as a `tools/call` result.
    pub async fn handle(&self, args: Map<String, Value>) -> Result<CallToolResult, ToolkitError> {
        let args = self
            .schema
            .parse_map(args)
            .map_err(|source| ToolkitError::InvalidArguments {
                tool: self.name.clone(),
                source,
            })?;
        let options = CallOptions {
            customer: args
                .get("customer")
                .and_then(Value::as_str)
                .filter(|c| !c.is_empty())
                .map(String::from),
        };
        let text = self.client.call_tool(&self.name, args, options).await?;
        Ok(CallToolResult {
            content: vec![ContentBlock::text(text)],
            ..Default::default()
        })
    }
}

/// Proxy tools in catalog order.
#[derive(Debug, Clone, Default)]
pub struct ProxyTable {
    tools: Vec<ProxyTool>,
}

impl ProxyTable {
    pub fn iter(&self) -> impl Iterator<Item = &ProxyTool> {
        self.tools.iter()
    }

    pub fn get(&self, name: &str) -> Option<&ProxyTool> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn handle(
        &self,
        name: &str,
        args: Map<String, Value>,
    ) -> Result<CallToolResult, ToolkitError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolkitError::UnknownTool(name.to_string()))?;
        tool.handle(args).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct McpProxyConverter;

impl ToolConverter for McpProxyConverter {
    type Tools = ProxyTable;

    fn empty(&self) -> Self::Tools {
        ProxyTable::default()
    }

    fn convert(&self, tools: Vec<ToolDescriptor>, client: &Arc<RemoteToolClient>) -> Self::Tools {
        ProxyTable {
            tools: tools
                .into_iter()
                .map(|d| ProxyTool::new(d, Arc::clone(client)))
                .collect(),
        }
    }
}

impl ToolkitAdapter<McpProxyConverter> {
    /// Handles a local `tools/call` for `name`.
    pub async fn handle(
        &self,
        name: &str,
        args: Map<String, Value>,
    ) -> Result<CallToolResult, ToolkitError> {
        self.get_tools()?.handle(name, args).await
    }
}
