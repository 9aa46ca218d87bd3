//! Tool-registry adapter: one [`Tool`] object per remote tool, collected in a
//! [`ToolRegistry`] with a shared `invoke(name, args)` entry point.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{ToolConverter, ToolkitAdapter};
use crate::client::{RemoteToolClient, ToolDescriptor};
use crate::configuration::CallOptions;
use crate::error::ToolkitError;
use crate::schema::{json_schema_to_object, ObjectSchema};

/// Tool metadata handed to an LLM: name, description and argument schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

/// A callable tool.
///
/// # Interaction
///
/// - Stored in a [`ToolRegistry`], which dispatches by [`Tool::name`]
/// - [`RemoteTool`] is the implementation produced from the remote catalog
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique within one registry.
    fn name(&self) -> &str;

    fn spec(&self) -> ToolSpec;

    /// Executes the tool. `options` carries per-call context (customer override).
    async fn call(&self, args: Value, options: Option<&CallOptions>)
        -> Result<String, ToolkitError>;
}

/// Remote catalog entry bound to the shared client.
///
/// Arguments are checked against the tool's object schema before the call is
/// proxied; undeclared keys pass through to the service.
pub struct RemoteTool {
    name: String,
    description: Option<String>,
    input_schema: Option<Value>,
    schema: ObjectSchema,
    client: Arc<RemoteToolClient>,
}

impl RemoteTool {
    pub fn new(descriptor: ToolDescriptor, client: Arc<RemoteToolClient>) -> Self {
        let schema = json_schema_to_object(descriptor.input_schema.as_ref());
        Self {
            name: descriptor.name,
            description: descriptor.description,
            input_schema: descriptor.input_schema,
            schema,
            client,
        }
    }

    pub fn schema(&self) -> &ObjectSchema {
        &self.schema
    }
}

impl fmt::Debug for RemoteTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

#[async_trait]
impl Tool for RemoteTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self
                .input_schema
                .clone()
                .unwrap_or_else(|| self.schema.to_json_schema()),
        }
    }

    async fn call(
        &self,
        args: Value,
        options: Option<&CallOptions>,
    ) -> Result<String, ToolkitError> {
        let arguments = self
            .schema
            .parse(&args)
            .map_err(|source| ToolkitError::InvalidArguments {
                tool: self.name.clone(),
                source,
            })?;
        self.client
            .call_tool(&self.name, arguments, options.cloned().unwrap_or_default())
            .await
    }
}

/// Tools by name, listed in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `tool`; a tool with the same name is replaced in place.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&pos) => self.tools[pos] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&pos| &self.tools[pos])
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn list(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Calls the tool named `name`; [`ToolkitError::UnknownTool`] when absent.
    pub async fn invoke(
        &self,
        name: &str,
        args: Value,
        options: Option<&CallOptions>,
    ) -> Result<String, ToolkitError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolkitError::UnknownTool(name.to_string()))?;
        tool.call(args, options).await
    }
}

/// Wraps every descriptor in a [`RemoteTool`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryConverter;

impl ToolConverter for RegistryConverter {
    type Tools = ToolRegistry;

    fn empty(&self) -> Self::Tools {
        ToolRegistry::new()
    }

    fn convert(&self, tools: Vec<ToolDescriptor>, client: &Arc<RemoteToolClient>) -> Self::Tools {
        let mut registry = ToolRegistry::new();
        for descriptor in tools {
            registry.register(Arc::new(RemoteTool::new(descriptor, Arc::clone(client))));
        }
        registry
    }
}

impl ToolkitAdapter<RegistryConverter> {
    /// Dispatches to the registered tool named `name`.
    pub async fn invoke(
        &self,
        name: &str,
        args: Value,
        options: Option<&CallOptions>,
    ) -> Result<String, ToolkitError> {
        self.get_tools()?.invoke(name, args, options).await
    }
}
