//! Toolkit adapters: remote catalog to framework-native tools.
//!
//! [`ToolkitAdapter`] connects a [`RemoteToolClient`], narrows the catalog with the
//! permission filter and hands the rest to a [`ToolConverter`], which produces the
//! destination framework's representation. Tools produced by a converter call back
//! into the shared client.
//!
//! Shipped converters:
//! - [`openai::OpenAiConverter`]: chat-completions function tools ([`OpenAiToolkit`]).
//! - [`registry::RegistryConverter`]: [`registry::Tool`] objects in a [`registry::ToolRegistry`] ([`RegistryToolkit`]).
//! - [`mcp_proxy::McpProxyConverter`]: per-field shapes for re-registering on a local MCP server ([`McpProxyToolkit`]).

pub mod mcp_proxy;
pub mod openai;
pub mod registry;

use std::borrow::Cow;
use std::sync::{Arc, PoisonError, RwLock};

use crate::client::{RemoteToolClient, ToolDescriptor};
use crate::configuration::{Configuration, ToolkitConfig};
use crate::error::ToolkitError;
use crate::init::AsyncInitializer;
use crate::permissions::ToolPermissionMap;

pub use mcp_proxy::McpProxyConverter;
pub use openai::OpenAiConverter;
pub use registry::RegistryConverter;

pub type OpenAiToolkit = ToolkitAdapter<OpenAiConverter>;
pub type RegistryToolkit = ToolkitAdapter<RegistryConverter>;
pub type McpProxyToolkit = ToolkitAdapter<McpProxyConverter>;

/// Turns the filtered catalog into one framework's tool collection.
///
/// `convert` must be pure apart from capturing `client`: every produced tool
/// invokes [`RemoteToolClient::call_tool`] when executed.
pub trait ToolConverter: Send + Sync {
    type Tools: Clone + Send + Sync;

    /// The collection exposed before initialization and after `close`.
    fn empty(&self) -> Self::Tools;

    fn convert(&self, tools: Vec<ToolDescriptor>, client: &Arc<RemoteToolClient>) -> Self::Tools;
}

/// Generic toolkit: client lifecycle, permission filtering and tool caching.
///
/// Holds its own [`AsyncInitializer`], separate from the client's.
pub struct ToolkitAdapter<C: ToolConverter> {
    client: Arc<RemoteToolClient>,
    configuration: Configuration,
    permissions: Cow<'static, ToolPermissionMap>,
    converter: C,
    initializer: AsyncInitializer<ToolkitError>,
    tools: RwLock<C::Tools>,
}

impl<C: ToolConverter> ToolkitAdapter<C> {
    /// Builds the client from `config`; fails only on a malformed secret key.
    pub fn new(config: ToolkitConfig, converter: C) -> Result<Self, ToolkitError> {
        let client = RemoteToolClient::new(config.client_config())?;
        Ok(Self::with_client(
            Arc::new(client),
            config.configuration,
            converter,
        ))
    }

    /// Adapter over an existing client (custom transport, shared connection).
    pub fn with_client(
        client: Arc<RemoteToolClient>,
        configuration: Configuration,
        converter: C,
    ) -> Self {
        let tools = RwLock::new(converter.empty());
        Self {
            client,
            configuration,
            permissions: Cow::Borrowed(ToolPermissionMap::builtin()),
            converter,
            initializer: AsyncInitializer::new(),
            tools,
        }
    }

    /// Replaces the built-in tool permission map.
    pub fn with_permission_map(mut self, permissions: ToolPermissionMap) -> Self {
        self.permissions = Cow::Owned(permissions);
        self
    }

    pub fn client(&self) -> &Arc<RemoteToolClient> {
        &self.client
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Connects the client, filters its catalog and converts the result.
    /// No-op when already initialized; a failure leaves the adapter uninitialized.
    pub async fn initialize(&self) -> Result<(), ToolkitError> {
        self.initializer
            .initialize(|| async {
                self.client.connect().await?;
                let actions = self.configuration.actions.as_ref();
                let allowed: Vec<ToolDescriptor> = self
                    .client
                    .get_tools()?
                    .into_iter()
                    .filter(|t| self.permissions.is_allowed(&t.name, actions))
                    .collect();
                tracing::debug!("toolkit exposes {} tools", allowed.len());
                let converted = self.converter.convert(allowed, &self.client);
                *self.tools.write().unwrap_or_else(PoisonError::into_inner) = converted;
                Ok(())
            })
            .await
    }

    pub fn is_initialized(&self) -> bool {
        self.initializer.is_initialized()
    }

    pub(crate) fn ensure_initialized(&self) -> Result<(), ToolkitError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(ToolkitError::NotInitialized)
        }
    }

    pub fn get_tools(&self) -> Result<C::Tools, ToolkitError> {
        self.ensure_initialized()?;
        Ok(self.cached_tools())
    }

    /// Tools without the initialization check; empty (with a warning) before `initialize`.
    #[deprecated(note = "call initialize() and use get_tools()")]
    pub fn tools(&self) -> C::Tools {
        if !self.is_initialized() {
            tracing::warn!(
                "accessing tools before initialization; call initialize() first. \
                 Tools will be empty until initialized."
            );
        }
        self.cached_tools()
    }

    fn cached_tools(&self) -> C::Tools {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Disconnects the client and drops the converted tools. No-op when not initialized.
    pub async fn close(&self) {
        if !self.initializer.reset_if_initialized() {
            return;
        }
        *self.tools.write().unwrap_or_else(PoisonError::into_inner) = self.converter.empty();
        self.client.disconnect().await;
    }
}

impl<C: ToolConverter + Default> ToolkitAdapter<C> {
    /// Constructs and initializes in one step.
    pub async fn create(config: ToolkitConfig) -> Result<Self, ToolkitError> {
        let toolkit = Self::new(config, C::default())?;
        toolkit.initialize().await?;
        Ok(toolkit)
    }
}
