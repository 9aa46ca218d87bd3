//! Client and toolkit configuration.
//!
//! [`Context`] scopes every request (connected account, customer, operating
//! mode). [`Configuration`] pairs it with the permission filter settings.
//! [`ClientConfig`] is what `RemoteToolClient` is built from; it can be assembled
//! programmatically or read from the environment via the `config` crate.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{ACCOUNT_PREFIX, MCP_HEADER, MCP_SERVER_URL, TOOLKIT_HEADER, VERSION};
use crate::error::ToolkitError;
use crate::permissions::PermissionConfig;

/// Operating mode; selects the `User-Agent` the client identifies with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Running behind a local MCP server.
    #[serde(rename = "modelcontextprotocol")]
    ModelContextProtocol,
    /// Embedded in an agent framework.
    #[default]
    Toolkit,
}

/// Settings applied to all requests made by one client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Connected account id; sent as the `Stripe-Account` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    /// Customer id injected into tool arguments unless overridden per call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
}

/// Toolkit configuration: request context plus the permission filter.
///
/// `actions: None` exposes every tool in the remote catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<PermissionConfig>,
}

/// Per-call options for `RemoteToolClient::call_tool`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Overrides the connection-time customer for this call only.
    pub customer: Option<String>,
}

impl CallOptions {
    pub fn customer(customer: impl Into<String>) -> Self {
        Self {
            customer: Some(customer.into()),
        }
    }
}

/// Everything `RemoteToolClient` needs to reach the remote service.
#[derive(Clone)]
pub struct ClientConfig {
    pub secret_key: String,
    pub context: Context,
    /// Applies to the handshake, catalog fetch and each tool call. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub server_url: String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("secret_key", &"<redacted>")
            .field("context", &self.context)
            .field("timeout", &self.timeout)
            .field("server_url", &self.server_url)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            context: Context::default(),
            timeout: None,
            server_url: MCP_SERVER_URL.to_string(),
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    /// `User-Agent` for the configured mode.
    pub fn user_agent(&self) -> String {
        match self.context.mode.unwrap_or_default() {
            Mode::ModelContextProtocol => format!("{}/{}", MCP_HEADER, VERSION),
            Mode::Toolkit => format!("{}/{}", TOOLKIT_HEADER, VERSION),
        }
    }

    /// Builds a config from the process environment after applying `.env` and
    /// `$XDG_CONFIG_HOME/<app_name>/config.toml` (existing env wins).
    ///
    /// Reads `STRIPE_SECRET_KEY` (required), `STRIPE_ACCOUNT`, `STRIPE_CUSTOMER`,
    /// `STRIPE_MCP_URL` and `STRIPE_MCP_TIMEOUT_MS`.
    pub fn from_env(app_name: &str, override_dir: Option<&Path>) -> Result<Self, ToolkitError> {
        env_config::load_and_apply(app_name, override_dir)?;
        let env = env_config::ToolkitEnv::from_env()?;
        if let Some(account) = env.account.as_deref() {
            if !account.starts_with(ACCOUNT_PREFIX) {
                return Err(ToolkitError::Config(format!(
                    "account must start with \"{}\": {}",
                    ACCOUNT_PREFIX, account
                )));
            }
        }
        let mut config = ClientConfig::new(env.secret_key).with_context(Context {
            account: env.account,
            customer: env.customer,
            mode: None,
        });
        if let Some(url) = env.server_url {
            config = config.with_server_url(url);
        }
        if let Some(timeout) = env.timeout {
            config = config.with_timeout(timeout);
        }
        Ok(config)
    }
}

/// Configuration for a [`ToolkitAdapter`](crate::toolkit::ToolkitAdapter).
#[derive(Debug, Clone)]
pub struct ToolkitConfig {
    pub secret_key: String,
    pub configuration: Configuration,
    pub timeout: Option<Duration>,
    pub server_url: Option<String>,
}

impl ToolkitConfig {
    pub fn new(secret_key: impl Into<String>, configuration: Configuration) -> Self {
        Self {
            secret_key: secret_key.into(),
            configuration,
            timeout: None,
            server_url: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// The client config this toolkit connects with.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.secret_key.clone())
            .with_context(self.configuration.context.clone().unwrap_or_default());
        config.timeout = self.timeout;
        if let Some(url) = &self.server_url {
            config.server_url = url.clone();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_depends_on_mode() {
        let toolkit = ClientConfig::new("rk_test_1");
        assert!(toolkit.user_agent().starts_with("stripe-agent-toolkit-rust/"));

        let mcp = ClientConfig::new("rk_test_1").with_context(Context {
            mode: Some(Mode::ModelContextProtocol),
            ..Default::default()
        });
        assert!(mcp.user_agent().starts_with("stripe-mcp-rust/"));
    }

    #[test]
    fn debug_redacts_secret_key() {
        let config = ClientConfig::new("rk_test_very_secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("very_secret"), "{}", rendered);
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn configuration_deserializes_context_and_actions() {
        let config: Configuration = serde_json::from_value(serde_json::json!({
            "context": {"account": "acct_123", "mode": "modelcontextprotocol"},
            "actions": {"customers": {"create": true}}
        }))
        .unwrap();
        let context = config.context.unwrap();
        assert_eq!(context.account.as_deref(), Some("acct_123"));
        assert_eq!(context.mode, Some(Mode::ModelContextProtocol));
        assert_eq!(config.actions.unwrap()["customers"].create, Some(true));
    }

    #[test]
    fn toolkit_config_carries_context_into_client_config() {
        let toolkit = ToolkitConfig::new(
            "rk_test_1",
            Configuration {
                context: Some(Context {
                    customer: Some("cus_1".into()),
                    ..Default::default()
                }),
                actions: None,
            },
        )
        .with_timeout(Duration::from_secs(5))
        .with_server_url("http://127.0.0.1:9");
        let client = toolkit.client_config();
        assert_eq!(client.context.customer.as_deref(), Some("cus_1"));
        assert_eq!(client.timeout, Some(Duration::from_secs(5)));
        assert_eq!(client.server_url, "http://127.0.0.1:9");
    }

    #[test]
    fn default_server_url_is_remote_endpoint() {
        assert_eq!(ClientConfig::new("rk_x").server_url, "https://mcp.stripe.com");
    }
}
