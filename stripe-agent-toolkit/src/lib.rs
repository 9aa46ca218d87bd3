//! # Stripe Agent Toolkit
//!
//! Adapters that expose the tools of Stripe's remote MCP service to agent
//! frameworks. The service does the work; this crate connects to it, narrows the
//! catalog to what the caller allowed, derives local argument validators and
//! hands each framework a tool collection whose execution is proxied back.
//!
//! ## Pieces
//!
//! - **Connection**: [`RemoteToolClient`] talks MCP over Streamable HTTP
//!   ([`HttpTransport`]), caches the catalog and normalizes tool results. Setup is
//!   guarded by [`AsyncInitializer`] (single flight, retry after failure).
//! - **Filtering**: [`is_tool_allowed`] / [`ToolPermissionMap`] decide which tools a
//!   [`PermissionConfig`] exposes. Unmapped tools are always exposed.
//! - **Schemas**: [`json_schema_to_shape`] and [`json_schema_to_object`] turn a tool's
//!   JSON Schema into per-field or whole-object validators.
//! - **Adapters**: [`ToolkitAdapter`] with [`OpenAiToolkit`], [`RegistryToolkit`] and
//!   [`McpProxyToolkit`].
//!
//! ## Example
//!
//! ```no_run
//! use stripe_agent_toolkit::{Configuration, OpenAiToolkit, ToolkitConfig};
//!
//! # async fn run() -> Result<(), stripe_agent_toolkit::ToolkitError> {
//! let config = ToolkitConfig::new("rk_test_...", Configuration::default());
//! let toolkit = OpenAiToolkit::create(config).await?;
//! let tools = toolkit.get_tools()?;
//! println!("{} tools", tools.len());
//! toolkit.close().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod configuration;
pub mod constants;
pub mod error;
pub mod init;
pub mod permissions;
pub mod schema;
pub mod toolkit;

pub use client::{
    validate_secret_key, CallToolResult, ContentBlock, CredentialClass, Endpoint, HttpTransport,
    HttpTransportFactory, McpTransport, RemoteToolClient, ToolDescriptor, TransportFactory,
};
pub use configuration::{CallOptions, ClientConfig, Configuration, Context, Mode, ToolkitConfig};
pub use error::{ToolkitError, TransportError};
pub use init::{AsyncInitializer, Attempt};
pub use permissions::{
    is_tool_allowed, Permission, PermissionConfig, ResourcePermissions, ToolPermissionMap,
};
pub use schema::{
    json_schema_to_object, json_schema_to_shape, FieldKind, FieldSchema, FieldShape, ItemKind,
    ObjectSchema, SchemaError, SchemaIssue,
};
pub use toolkit::openai::{ChatCompletionTool, ChatCompletionToolCall, ToolMessage};
pub use toolkit::registry::{RemoteTool, Tool, ToolRegistry, ToolSpec};
pub use toolkit::{
    McpProxyToolkit, OpenAiToolkit, RegistryToolkit, ToolConverter, ToolkitAdapter,
};
