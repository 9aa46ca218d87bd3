//! MCP session over Streamable HTTP: POST JSON-RPC to the service URL, parse the
//! JSON (or SSE) response.
//!
//! Every POST carries `Accept: application/json, text/event-stream`,
//! `MCP-Protocol-Version`, the endpoint headers (credential, `User-Agent`,
//! optional `Stripe-Account`) and, once the server has assigned one, the
//! `MCP-Session-Id`. `close` ends the session with a DELETE.
//!
//! **Interaction**: Created by [`HttpTransportFactory`] for each `connect` attempt
//! of `RemoteToolClient`. Uses async reqwest; safe to create and drop from tokio context.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use mcp_core::{NotificationMessage, RequestMessage};
use reqwest::header::HeaderValue;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::transport::{CallToolResult, Endpoint, McpTransport, ToolDescriptor, TransportFactory};
use crate::constants::VERSION;
use crate::error::TransportError;

/// MCP protocol version for the HTTP header and the initialize request.
const MCP_PROTOCOL_VERSION: &str = "2025-11-25";
const SESSION_HEADER: &str = "MCP-Session-Id";
const CLIENT_NAME: &str = "stripe-agent-toolkit";

#[derive(Debug, Deserialize)]
struct JsonRpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcErrorBody>,
}

impl JsonRpcResponse {
    fn is_response(&self) -> bool {
        self.result.is_some() || self.error.is_some()
    }

    fn into_result(self) -> Result<Value, TransportError> {
        if let Some(err) = self.error {
            return Err(TransportError::JsonRpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

fn try_response(data: &str) -> Option<JsonRpcResponse> {
    serde_json::from_str::<JsonRpcResponse>(data)
        .ok()
        .filter(JsonRpcResponse::is_response)
}

/// Parses the JSON-RPC response from an HTTP body: a single JSON object for
/// `application/json`, or the first event carrying `result`/`error` for
/// `text/event-stream`. Multi-line `data:` fields of one event are joined with `\n`.
fn parse_json_rpc_from_body(
    body: &str,
    content_type: Option<&HeaderValue>,
) -> Result<JsonRpcResponse, TransportError> {
    let is_sse = content_type
        .and_then(|v| v.to_str().ok())
        .map(|s| s.contains("text/event-stream"))
        .unwrap_or(false);
    if !is_sse {
        return serde_json::from_str(body)
            .map_err(|e| TransportError::Protocol(format!("response json: {}", e)));
    }

    let mut event_data = String::new();
    for line in body.lines() {
        if let Some(data) = line.strip_prefix("data:") {
            let data = data.strip_prefix(' ').unwrap_or(data);
            if !event_data.is_empty() {
                event_data.push('\n');
            }
            event_data.push_str(data);
        } else if line.trim().is_empty() && !event_data.is_empty() {
            if let Some(r) = try_response(&event_data) {
                return Ok(r);
            }
            event_data.clear();
        }
    }
    if let Some(r) = try_response(&event_data) {
        return Ok(r);
    }
    Err(TransportError::Protocol(
        "SSE stream: no JSON-RPC response (result/error) found".into(),
    ))
}

fn body_or_placeholder(text: String) -> String {
    if text.is_empty() {
        "no body".to_string()
    } else {
        text
    }
}

/// MCP transport over Streamable HTTP.
pub struct HttpTransport {
    client: Client,
    endpoint: Endpoint,
    /// Session id from the server's `MCP-Session-Id` header; sent on subsequent requests.
    session_id: Mutex<Option<String>>,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(endpoint: Endpoint) -> Result<Self, TransportError> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, endpoint))
    }

    /// Uses a caller-provided reqwest client (proxies, TLS settings).
    pub fn with_client(client: Client, endpoint: Endpoint) -> Self {
        Self {
            client,
            endpoint,
            session_id: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn session_id(&self) -> Option<String> {
        self.session_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_session_id(&self, id: Option<String>) {
        *self.session_id.lock().unwrap_or_else(PoisonError::into_inner) = id;
    }

    fn next_request_id(&self) -> String {
        format!("stripe-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn with_common_headers(&self, mut req: RequestBuilder) -> RequestBuilder {
        req = req.header("MCP-Protocol-Version", MCP_PROTOCOL_VERSION);
        for (k, v) in &self.endpoint.headers {
            req = req.header(k.as_str(), v.as_str());
        }
        if let Some(sid) = self.session_id() {
            req = req.header(SESSION_HEADER, sid);
        }
        req
    }

    fn post(&self, body: Vec<u8>) -> RequestBuilder {
        let req = self
            .client
            .post(&self.endpoint.url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream")
            .body(body);
        self.with_common_headers(req)
    }

    /// Sends one JSON-RPC request and returns its `result`.
    async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let id = self.next_request_id();
        let request = RequestMessage::new(id.as_str(), method, params);
        let body = serde_json::to_vec(&request)
            .map_err(|e| TransportError::Protocol(format!("encode {}: {}", method, e)))?;
        let resp = self.post(body).send().await?;
        let status = resp.status();
        if let Some(sid) = resp
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            self.set_session_id(Some(sid.to_string()));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                method: method.to_string(),
                status: status.as_u16(),
                body: body_or_placeholder(text),
            });
        }
        let content_type = resp.headers().get("content-type").cloned();
        let text = resp.text().await?;
        parse_json_rpc_from_body(&text, content_type.as_ref())?.into_result()
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), TransportError> {
        let notification = NotificationMessage::new(method, params);
        let body = serde_json::to_vec(&notification)
            .map_err(|e| TransportError::Protocol(format!("encode {}: {}", method, e)))?;
        let resp = self.post(body).send().await?;
        let status = resp.status();
        if status != StatusCode::ACCEPTED && !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                method: method.to_string(),
                status: status.as_u16(),
                body: body_or_placeholder(text),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl McpTransport for HttpTransport {
    /// POST `initialize`, capture `MCP-Session-Id`, POST `notifications/initialized`.
    async fn initialize(&self) -> Result<(), TransportError> {
        let params = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": CLIENT_NAME,
                "version": VERSION
            }
        });
        self.request("initialize", params).await?;
        self.notify("notifications/initialized", None).await
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, TransportError> {
        let result = self.request("tools/list", json!({})).await?;
        let tools = result
            .get("tools")
            .cloned()
            .ok_or_else(|| TransportError::Protocol("no tools in response".into()))?;
        serde_json::from_value(tools)
            .map_err(|e| TransportError::Protocol(format!("tools/list: {}", e)))
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, TransportError> {
        let params = json!({ "name": name, "arguments": arguments });
        let result = self.request("tools/call", params).await?;
        serde_json::from_value(result)
            .map_err(|e| TransportError::Protocol(format!("tools/call: {}", e)))
    }

    /// DELETE with the session id. No-op when the server never assigned one;
    /// `405 Method Not Allowed` means the server does not support explicit termination.
    async fn close(&self) -> Result<(), TransportError> {
        let Some(_) = self.session_id() else {
            return Ok(());
        };
        let req = self.with_common_headers(self.client.delete(&self.endpoint.url));
        self.set_session_id(None);
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() || status == StatusCode::METHOD_NOT_ALLOWED {
            return Ok(());
        }
        let text = resp.text().await.unwrap_or_default();
        Err(TransportError::Status {
            method: "DELETE".to_string(),
            status: status.as_u16(),
            body: body_or_placeholder(text),
        })
    }
}

/// Default factory: one [`HttpTransport`] per connection attempt, sharing a reqwest client.
#[derive(Clone, Default)]
pub struct HttpTransportFactory {
    client: Option<Client>,
}

impl HttpTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client: Some(client),
        }
    }
}

impl TransportFactory for HttpTransportFactory {
    fn create(&self, endpoint: &Endpoint) -> Result<Arc<dyn McpTransport>, TransportError> {
        let transport = match &self.client {
            Some(client) => HttpTransport::with_client(client.clone(), endpoint.clone()),
            None => HttpTransport::new(endpoint.clone())?,
        };
        Ok(Arc::new(transport))
    }
}
