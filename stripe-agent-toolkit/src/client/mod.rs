//! Remote tool client: one logical MCP connection to the Stripe tool service.
//!
//! [`RemoteToolClient`] validates the credential at construction, connects through
//! an [`AsyncInitializer`] (handshake plus catalog fetch), caches the catalog and
//! proxies `tools/call` with customer-context injection. Each connection attempt
//! gets a fresh transport from the [`TransportFactory`]; a transport is only kept
//! once the whole attempt succeeded.

mod http;
mod transport;

pub use http::{HttpTransport, HttpTransportFactory};
pub use transport::{
    CallToolResult, ContentBlock, Endpoint, McpTransport, ToolDescriptor, TransportFactory,
};

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::{Map, Value};

use crate::configuration::{CallOptions, ClientConfig};
use crate::constants::{ACCOUNT_HEADER, RESTRICTED_KEY_PREFIX, SECRET_KEY_PREFIX};
use crate::error::{ToolkitError, TransportError};
use crate::init::{AsyncInitializer, Attempt};

const CUSTOMER_ARG: &str = "customer";

/// Credential class, derived from the key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialClass {
    /// `sk_*`: full access. Still accepted, but deprecated for MCP.
    Secret,
    /// `rk_*`: restricted key.
    Restricted,
}

/// Checks the key prefix. Empty or unknown prefixes fail with
/// [`ToolkitError::InvalidCredentialFormat`].
pub fn validate_secret_key(key: &str) -> Result<CredentialClass, ToolkitError> {
    if key.is_empty() {
        return Err(ToolkitError::InvalidCredentialFormat(
            "API key is required.".to_string(),
        ));
    }
    if key.starts_with(RESTRICTED_KEY_PREFIX) {
        Ok(CredentialClass::Restricted)
    } else if key.starts_with(SECRET_KEY_PREFIX) {
        Ok(CredentialClass::Secret)
    } else {
        Err(ToolkitError::InvalidCredentialFormat(
            "Invalid API key format. Expected sk_* (secret key) or rk_* (restricted key)."
                .to_string(),
        ))
    }
}

/// Endpoint (URL plus per-request headers) for `config`.
pub fn endpoint_for(config: &ClientConfig) -> Endpoint {
    let mut headers = vec![
        (
            "Authorization".to_string(),
            format!("Bearer {}", config.secret_key),
        ),
        ("User-Agent".to_string(), config.user_agent()),
    ];
    if let Some(account) = &config.context.account {
        headers.push((ACCOUNT_HEADER.to_string(), account.clone()));
    }
    Endpoint {
        url: config.server_url.clone(),
        headers,
    }
}

struct Connection {
    transport: Arc<dyn McpTransport>,
    tools: Vec<ToolDescriptor>,
}

/// Client for the remote MCP tool service.
///
/// **Interaction**: Shared (`Arc`) by a `ToolkitAdapter` and every tool it produces;
/// each produced tool calls [`RemoteToolClient::call_tool`].
pub struct RemoteToolClient {
    config: ClientConfig,
    endpoint: Endpoint,
    factory: Arc<dyn TransportFactory>,
    initializer: AsyncInitializer<ToolkitError>,
    connection: RwLock<Option<Connection>>,
}

impl std::fmt::Debug for RemoteToolClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteToolClient")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl RemoteToolClient {
    /// Client over Streamable HTTP.
    pub fn new(config: ClientConfig) -> Result<Self, ToolkitError> {
        Self::with_transport_factory(config, Arc::new(HttpTransportFactory::new()))
    }

    /// Client whose connections are created by `factory`.
    pub fn with_transport_factory(
        config: ClientConfig,
        factory: Arc<dyn TransportFactory>,
    ) -> Result<Self, ToolkitError> {
        if validate_secret_key(&config.secret_key)? == CredentialClass::Secret {
            tracing::warn!(
                "using sk_* keys with Stripe MCP is deprecated; switch to rk_* (restricted keys) \
                 for better security. See: https://docs.stripe.com/keys#create-restricted-api-keys"
            );
        }
        let endpoint = endpoint_for(&config);
        Ok(Self {
            config,
            endpoint,
            factory,
            initializer: AsyncInitializer::new(),
            connection: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Connects and caches the catalog. No-op when already connected; concurrent
    /// callers share one attempt. A failed attempt can be retried by calling again.
    pub async fn connect(&self) -> Result<(), ToolkitError> {
        self.initializer
            .initialize_attempt(|attempt| self.establish(attempt))
            .await
    }

    async fn establish(&self, attempt: Attempt) -> Result<(), ToolkitError> {
        let url = self.endpoint.url.clone();
        let failed = |source: TransportError| ToolkitError::ConnectionFailed {
            url: url.clone(),
            source: Arc::new(source),
        };

        let transport = self.factory.create(&self.endpoint).map_err(&failed)?;
        let handshake = async {
            self.timed(transport.initialize()).await?;
            self.timed(transport.list_tools()).await
        };
        match handshake.await {
            Ok(tools) => {
                let stored = {
                    let mut slot = self
                        .connection
                        .write()
                        .unwrap_or_else(PoisonError::into_inner);
                    let current = self.initializer.is_current(attempt);
                    if current {
                        *slot = Some(Connection {
                            transport: Arc::clone(&transport),
                            tools,
                        });
                    }
                    current
                };
                if stored {
                    tracing::debug!("connected to {}", url);
                    return Ok(());
                }
                tracing::debug!("connection to {} superseded; closing it", url);
                if let Err(e) = self.timed(transport.close()).await {
                    tracing::debug!("discarding superseded session: {}", e);
                }
                Err(ToolkitError::NotConnected)
            }
            Err(e) => {
                if let Err(close_err) = self.timed(transport.close()).await {
                    tracing::debug!("discarding failed session: {}", close_err);
                }
                Err(failed(e))
            }
        }
    }

    async fn timed<T>(
        &self,
        fut: impl Future<Output = Result<T, TransportError>>,
    ) -> Result<T, TransportError> {
        match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| TransportError::Timeout(limit))?,
            None => fut.await,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.initializer.is_initialized()
    }

    fn transport(&self) -> Result<Arc<dyn McpTransport>, ToolkitError> {
        if !self.is_connected() {
            return Err(ToolkitError::NotConnected);
        }
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| Arc::clone(&c.transport))
            .ok_or(ToolkitError::NotConnected)
    }

    /// The cached catalog, in the order the service returned it.
    pub fn get_tools(&self) -> Result<Vec<ToolDescriptor>, ToolkitError> {
        if !self.is_connected() {
            return Err(ToolkitError::NotConnected);
        }
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.tools.clone())
            .ok_or(ToolkitError::NotConnected)
    }

    /// Calls `name` and returns its textual result.
    ///
    /// The customer sent is `options.customer`, else the connection context's
    /// customer, else none; when present it replaces any `customer` already in
    /// `arguments` (a differing value is logged). Returns the first non-empty text
    /// block, or the whole result as JSON when there is none.
    pub async fn call_tool(
        &self,
        name: &str,
        mut arguments: Map<String, Value>,
        options: CallOptions,
    ) -> Result<String, ToolkitError> {
        let transport = self.transport()?;

        let customer = options
            .customer
            .or_else(|| self.config.context.customer.clone());
        if let Some(customer) = customer {
            if let Some(existing) = arguments.get(CUSTOMER_ARG) {
                if existing.as_str() != Some(customer.as_str()) {
                    tracing::warn!(
                        "customer context conflict for tool {}: args.customer={} override={}; using override",
                        name,
                        existing,
                        customer
                    );
                }
            }
            arguments.insert(CUSTOMER_ARG.to_string(), Value::String(customer));
        }

        let result = self
            .timed(transport.call_tool(name, arguments))
            .await
            .map_err(|e| ToolkitError::ToolTransport {
                tool: name.to_string(),
                source: Arc::new(e),
            })?;
        result_text(name, &result)
    }

    /// Closes the session and clears the catalog. No-op unless connected, so it
    /// is safe to call repeatedly, before `connect`, or while a connect is in
    /// flight. Close errors are logged, never returned.
    pub async fn disconnect(&self) {
        let connection = {
            let mut slot = self
                .connection
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if !self.initializer.reset_if_initialized() {
                return;
            }
            slot.take()
        };
        if let Some(connection) = connection {
            if let Err(e) = self.timed(connection.transport.close()).await {
                tracing::warn!("error closing MCP session at {}: {}", self.endpoint.url, e);
            }
        }
    }
}

fn result_text(tool: &str, result: &CallToolResult) -> Result<String, ToolkitError> {
    let text = result.first_text().filter(|t| !t.is_empty());
    if result.is_error {
        return Err(ToolkitError::ToolFailed {
            tool: tool.to_string(),
            message: text.unwrap_or("Tool execution failed").to_string(),
        });
    }
    match text {
        Some(text) => Ok(text.to_string()),
        None => serde_json::to_string(result).map_err(|e| ToolkitError::ToolFailed {
            tool: tool.to_string(),
            message: format!("result json: {}", e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{Context, Mode};
    use serde_json::json;

    #[test]
    fn key_prefixes_select_credential_class() {
        assert_eq!(
            validate_secret_key("rk_test_abc").unwrap(),
            CredentialClass::Restricted
        );
        assert_eq!(
            validate_secret_key("sk_test_abc").unwrap(),
            CredentialClass::Secret
        );
        assert!(matches!(
            validate_secret_key(""),
            Err(ToolkitError::InvalidCredentialFormat(m)) if m == "API key is required."
        ));
        assert!(matches!(
            validate_secret_key("pk_test_abc"),
            Err(ToolkitError::InvalidCredentialFormat(_))
        ));
    }

    #[test]
    fn endpoint_headers_follow_context() {
        let config = ClientConfig::new("rk_test_1").with_context(Context {
            account: Some("acct_42".into()),
            customer: None,
            mode: Some(Mode::ModelContextProtocol),
        });
        let endpoint = endpoint_for(&config);
        assert_eq!(endpoint.url, "https://mcp.stripe.com");
        assert_eq!(endpoint.header("authorization"), Some("Bearer rk_test_1"));
        assert_eq!(endpoint.header("Stripe-Account"), Some("acct_42"));
        assert!(endpoint
            .header("User-Agent")
            .unwrap()
            .starts_with("stripe-mcp-rust/"));

        let plain = endpoint_for(&ClientConfig::new("rk_test_1"));
        assert_eq!(plain.header("Stripe-Account"), None);
    }

    #[test]
    fn error_result_uses_first_text_or_default() {
        let with_text: CallToolResult = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "No such customer"}],
            "isError": true
        }))
        .unwrap();
        match result_text("retrieve_customer", &with_text) {
            Err(ToolkitError::ToolFailed { tool, message }) => {
                assert_eq!(tool, "retrieve_customer");
                assert_eq!(message, "No such customer");
            }
            other => panic!("expected ToolFailed, got {:?}", other),
        }

        let bare = CallToolResult {
            is_error: true,
            ..Default::default()
        };
        match result_text("x", &bare) {
            Err(ToolkitError::ToolFailed { message, .. }) => {
                assert_eq!(message, "Tool execution failed")
            }
            other => panic!("expected ToolFailed, got {:?}", other),
        }
    }

    #[test]
    fn empty_text_falls_back_to_json() {
        let result = CallToolResult {
            content: vec![ContentBlock::text("")],
            is_error: false,
            structured_content: Some(json!({"id": "cus_1"})),
        };
        let out = result_text("x", &result).unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["structuredContent"]["id"], json!("cus_1"));
    }
}
