//! Error types for the toolkit and its transport.
//!
//! `ToolkitError` is what every public operation returns. It is `Clone` because
//! [`AsyncInitializer`](crate::init::AsyncInitializer) hands one failed attempt's
//! error to every caller that was waiting on it; transport causes are kept behind
//! `Arc` so `source()` still reaches the original error.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::schema::SchemaError;

/// Errors raised at the transport boundary (HTTP, JSON-RPC framing, timeouts).
///
/// **Interaction**: Returned by [`McpTransport`](crate::client::McpTransport)
/// implementations; wrapped into [`ToolkitError::ConnectionFailed`] or
/// [`ToolkitError::ToolTransport`] by `RemoteToolClient`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http: {0}")]
    Http(String),
    #[error("{method} HTTP {status}: {body}")]
    Status {
        method: String,
        status: u16,
        body: String,
    },
    #[error("JSON-RPC error {code}: {message}")]
    JsonRpc { code: i64, message: String },
    #[error("protocol: {0}")]
    Protocol(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Http(e.to_string())
    }
}

/// Errors from the remote tool client and the toolkit adapters.
#[derive(Debug, Clone, Error)]
pub enum ToolkitError {
    /// The secret key is empty or has neither accepted prefix.
    #[error("{0}")]
    InvalidCredentialFormat(String),

    #[error("MCP client not connected. Call connect() before using tools.")]
    NotConnected,

    #[error("toolkit not initialized. Call initialize() first.")]
    NotInitialized,

    #[error("failed to connect to MCP server at {url}. No fallback execution path is available: {source}")]
    ConnectionFailed {
        url: String,
        #[source]
        source: Arc<TransportError>,
    },

    /// The remote service answered with `isError: true`.
    #[error("failed to execute tool '{tool}': {message}")]
    ToolFailed { tool: String, message: String },

    /// The `tools/call` request itself failed.
    #[error("failed to execute tool '{tool}': {source}")]
    ToolTransport {
        tool: String,
        #[source]
        source: Arc<TransportError>,
    },

    #[error("invalid arguments for tool '{tool}': {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: SchemaError,
    },

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("config: {0}")]
    Config(String),
}

impl ToolkitError {
    /// True when the failure was caused by an operation exceeding the configured timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            ToolkitError::ConnectionFailed { source, .. }
            | ToolkitError::ToolTransport { source, .. } => {
                matches!(source.as_ref(), TransportError::Timeout(_))
            }
            _ => false,
        }
    }
}

impl From<env_config::LoadError> for ToolkitError {
    fn from(e: env_config::LoadError) -> Self {
        ToolkitError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    /// **Scenario**: ConnectionFailed names the endpoint and keeps the transport cause as source.
    #[test]
    fn connection_failed_names_url_and_keeps_source() {
        let err = ToolkitError::ConnectionFailed {
            url: "https://mcp.example.test".into(),
            source: Arc::new(TransportError::Protocol("bad handshake".into())),
        };
        let s = err.to_string();
        assert!(s.contains("https://mcp.example.test"), "{}", s);
        assert!(s.contains("bad handshake"), "{}", s);
        assert!(err.source().is_some());
        assert!(!err.is_timeout());
    }

    #[test]
    fn timeout_is_distinguishable() {
        let err = ToolkitError::ToolTransport {
            tool: "list_customers".into(),
            source: Arc::new(TransportError::Timeout(Duration::from_millis(50))),
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("list_customers"));
    }

    #[test]
    fn tool_failed_display_names_tool() {
        let err = ToolkitError::ToolFailed {
            tool: "create_refund".into(),
            message: "charge already refunded".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to execute tool 'create_refund': charge already refunded"
        );
    }
}
