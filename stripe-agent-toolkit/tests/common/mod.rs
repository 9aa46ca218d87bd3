//! In-memory MCP service for integration tests.
//!
//! [`MockFactory`] wraps a [`MockService`]; every `create` hands out a new
//! session that records what the client sent and answers from a fixed catalog.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use stripe_agent_toolkit::{
    CallToolResult, ClientConfig, ContentBlock, Endpoint, McpTransport, RemoteToolClient,
    ToolDescriptor, TransportError, TransportFactory,
};

pub fn descriptor(name: &str, description: Option<&str>, schema: Option<Value>) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        description: description.map(String::from),
        input_schema: schema,
    }
}

/// `create_customer` (requires `name`) and `list_customers` (no required fields).
pub fn two_tool_catalog() -> Vec<ToolDescriptor> {
    vec![
        descriptor(
            "create_customer",
            Some("Create a customer"),
            Some(json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "Customer name"},
                    "email": {"type": "string"}
                },
                "required": ["name"]
            })),
        ),
        descriptor(
            "list_customers",
            None,
            Some(json!({
                "type": "object",
                "properties": {"limit": {"type": "integer"}}
            })),
        ),
    ]
}

pub fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}

#[derive(Default)]
pub struct MockService {
    tools: Vec<ToolDescriptor>,
    results: HashMap<String, CallToolResult>,
    init_failures: AtomicUsize,
    list_failures: AtomicUsize,
    init_delay: Option<Duration>,
    call_delay: Option<Duration>,
    close_fails: bool,
    pub sessions: AtomicUsize,
    pub initializes: AtomicUsize,
    pub closes: AtomicUsize,
    pub endpoints: Mutex<Vec<Endpoint>>,
    pub calls: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl MockService {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self {
            tools,
            ..Default::default()
        }
    }

    /// Answers `tools/call` for `name` with `result` instead of `ok:<name>`.
    pub fn with_result(mut self, name: &str, result: CallToolResult) -> Self {
        self.results.insert(name.to_string(), result);
        self
    }

    /// The first `n` handshakes fail.
    pub fn failing_initialize(self, n: usize) -> Self {
        self.init_failures.store(n, Ordering::SeqCst);
        self
    }

    /// The first `n` catalog fetches fail.
    pub fn failing_list_tools(self, n: usize) -> Self {
        self.list_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = Some(delay);
        self
    }

    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.close_fails = true;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn last_call(&self) -> Option<(String, Map<String, Value>)> {
        self.calls.lock().unwrap().last().cloned()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// [`TransportFactory`] handing out sessions of one [`MockService`].
pub struct MockFactory(pub Arc<MockService>);

impl TransportFactory for MockFactory {
    fn create(&self, endpoint: &Endpoint) -> Result<Arc<dyn McpTransport>, TransportError> {
        self.0.sessions.fetch_add(1, Ordering::SeqCst);
        self.0.endpoints.lock().unwrap().push(endpoint.clone());
        Ok(Arc::new(MockSession {
            service: Arc::clone(&self.0),
        }))
    }
}

struct MockSession {
    service: Arc<MockService>,
}

#[async_trait]
impl McpTransport for MockSession {
    async fn initialize(&self) -> Result<(), TransportError> {
        let service = &self.service;
        service.initializes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = service.init_delay {
            tokio::time::sleep(delay).await;
        }
        let remaining = service.init_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            service.init_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(TransportError::Status {
                method: "initialize".into(),
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, TransportError> {
        let service = &self.service;
        let remaining = service.list_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            service.list_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(TransportError::JsonRpc {
                code: -32603,
                message: "catalog unavailable".into(),
            });
        }
        Ok(service.tools.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, TransportError> {
        if let Some(delay) = self.service.call_delay {
            tokio::time::sleep(delay).await;
        }
        self.service
            .calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));
        Ok(self
            .service
            .results
            .get(name)
            .cloned()
            .unwrap_or_else(|| CallToolResult {
                content: vec![ContentBlock::text(format!("ok:{}", name))],
                ..Default::default()
            }))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.service.closes.fetch_add(1, Ordering::SeqCst);
        if self.service.close_fails {
            return Err(TransportError::Http("connection reset".into()));
        }
        Ok(())
    }
}

/// Client over `service` with a restricted key.
pub fn client(service: &Arc<MockService>) -> RemoteToolClient {
    client_with(service, ClientConfig::new("rk_test_123"))
}

pub fn client_with(service: &Arc<MockService>, config: ClientConfig) -> RemoteToolClient {
    RemoteToolClient::with_transport_factory(config, Arc::new(MockFactory(Arc::clone(service))))
        .expect("valid key")
}
