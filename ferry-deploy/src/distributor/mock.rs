//! Recording node double for tests
//!
//! Records every remote call in order and answers with deterministic values:
//! module hashes are `<name>-hash`, blueprint ids `bp-<name>` (or the pinned
//! id) and service ids `svc-<blueprint id>`. Failures can be injected per
//! operation, optionally limited to one node or to a number of calls.

use async_trait::async_trait;
use ferry_client::{CallbackRegistry, ClientError, Connector, NodeConnection, Result};
use ferry_core::domain::blueprint::Blueprint;
use ferry_core::domain::module::ModuleArtifact;
use ferry_core::domain::node::Node;
use ferry_core::dto::script::{CallbackDelivery, SendScript};
use serde_json::{Map, Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::config::DeployConfig;
use crate::distributor::Distributor;
use crate::retry::RetryPolicy;

/// Distributor over `mock` that retries without waiting
pub fn distributor(mock: &MockConnector) -> Distributor {
    let mut config = DeployConfig::default();
    config.retry = RetryPolicy::immediate(3);
    Distributor::new(Arc::new(mock.clone()), config)
}

/// Node with a loopback address and the given peer id
pub fn node(peer: &str) -> Node {
    Node::new(peer, format!("/ip4/127.0.0.1/tcp/4310/ws/p2p/{}", peer))
}

/// A remote call observed by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect {
        node: String,
    },
    UploadModule {
        node: String,
        name: String,
    },
    AddBlueprint {
        node: String,
        name: String,
        dependencies: Vec<String>,
        id: Option<String>,
    },
    CreateService {
        node: String,
        blueprint_id: String,
    },
    GetModules {
        node: String,
    },
    GetInterfaces {
        node: String,
    },
    GetInterface {
        node: String,
        service_id: String,
    },
    SendScript {
        node: String,
        script: String,
        data: Map<String, Value>,
        callback: String,
    },
    AddScript {
        node: String,
        script: String,
        interval_sec: u64,
    },
}

impl Call {
    pub fn connect(node: &str) -> Self {
        Call::Connect {
            node: node.to_string(),
        }
    }

    pub fn upload_module(node: &str, name: &str) -> Self {
        Call::UploadModule {
            node: node.to_string(),
            name: name.to_string(),
        }
    }

    pub fn create_service(node: &str, blueprint_id: &str) -> Self {
        Call::CreateService {
            node: node.to_string(),
            blueprint_id: blueprint_id.to_string(),
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            Call::Connect { .. } => "connect",
            Call::UploadModule { .. } => "upload_module",
            Call::AddBlueprint { .. } => "add_blueprint",
            Call::CreateService { .. } => "create_service",
            Call::GetModules { .. } => "get_modules",
            Call::GetInterfaces { .. } => "get_interfaces",
            Call::GetInterface { .. } => "get_interface",
            Call::SendScript { .. } => "send_script",
            Call::AddScript { .. } => "add_script",
        }
    }

    pub fn node(&self) -> &str {
        match self {
            Call::Connect { node }
            | Call::UploadModule { node, .. }
            | Call::AddBlueprint { node, .. }
            | Call::CreateService { node, .. }
            | Call::GetModules { node }
            | Call::GetInterfaces { node }
            | Call::GetInterface { node, .. }
            | Call::SendScript { node, .. }
            | Call::AddScript { node, .. } => node,
        }
    }
}

#[derive(Debug, Clone)]
struct Failure {
    operation: &'static str,
    node: Option<String>,
    /// `None` fails forever
    remaining: Option<usize>,
    transient: bool,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<Call>,
    failures: Vec<Failure>,
    blueprint_id: Option<String>,
    silent_scripts: bool,
    callback_args: Option<Vec<Value>>,
}

impl MockState {
    fn record(&mut self, call: Call) -> Result<()> {
        let operation = call.operation();
        let node = call.node().to_string();
        self.calls.push(call);

        let failure = self.failures.iter_mut().find(|f| {
            f.operation == operation
                && f.node.as_deref().is_none_or(|n| n == node)
                && f.remaining.is_none_or(|r| r > 0)
        });

        match failure {
            Some(failure) => {
                if let Some(remaining) = failure.remaining.as_mut() {
                    *remaining -= 1;
                }
                if failure.transient {
                    Err(ClientError::Unavailable(format!("{} on {}", operation, node)))
                } else {
                    Err(ClientError::api_error(400, format!("{} rejected", operation)))
                }
            }
            None => Ok(()),
        }
    }
}

/// Connector handing out recording connections that share one call log
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `times` calls of `operation` with a retryable error
    pub fn failing(self, operation: &'static str, times: usize) -> Self {
        self.add_failure(Failure {
            operation,
            node: None,
            remaining: Some(times),
            transient: true,
        })
    }

    /// Rejects every call of `operation` on `node` with a permanent error
    pub fn rejecting_on(self, operation: &'static str, node: &str) -> Self {
        self.add_failure(Failure {
            operation,
            node: Some(node.to_string()),
            remaining: None,
            transient: false,
        })
    }

    /// Answers every blueprint registration with this id
    pub fn with_blueprint_id(self, id: &str) -> Self {
        self.state.lock().unwrap().blueprint_id = Some(id.to_string());
        self
    }

    /// Arguments scripts call back with; defaults to the script's data
    pub fn with_callback_args(self, args: Vec<Value>) -> Self {
        self.state.lock().unwrap().callback_args = Some(args);
        self
    }

    /// Scripts are accepted but never call back
    pub fn silent_scripts(self) -> Self {
        self.state.lock().unwrap().silent_scripts = true;
        self
    }

    fn add_failure(self, failure: Failure) -> Self {
        self.state.lock().unwrap().failures.push(failure);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls of one operation, in order
    pub fn calls_of(&self, operation: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation() == operation)
            .collect()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls_of(operation).len()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, node: &Node) -> Result<Arc<dyn NodeConnection>> {
        self.state.lock().unwrap().record(Call::Connect {
            node: node.peer_id.clone(),
        })?;

        Ok(Arc::new(MockConnection {
            node: node.clone(),
            state: self.state.clone(),
            callbacks: CallbackRegistry::new(),
        }))
    }
}

struct MockConnection {
    node: Node,
    state: Arc<Mutex<MockState>>,
    callbacks: CallbackRegistry,
}

impl MockConnection {
    fn record(&self, call: Call) -> Result<()> {
        self.state.lock().unwrap().record(call)
    }

    fn peer(&self) -> String {
        self.node.peer_id.clone()
    }

    fn call_count(&self, operation: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }
}

#[async_trait]
impl NodeConnection for MockConnection {
    fn node(&self) -> &Node {
        &self.node
    }

    async fn upload_module(&self, module: &ModuleArtifact, _ttl: Duration) -> Result<String> {
        self.record(Call::UploadModule {
            node: self.peer(),
            name: module.name().to_string(),
        })?;
        Ok(format!("{}-hash", module.name()))
    }

    async fn add_blueprint(&self, blueprint: &Blueprint, _ttl: Duration) -> Result<String> {
        self.record(Call::AddBlueprint {
            node: self.peer(),
            name: blueprint.name.clone(),
            dependencies: blueprint.dependencies.clone(),
            id: blueprint.id.clone(),
        })?;

        let forced = self.state.lock().unwrap().blueprint_id.clone();
        Ok(forced
            .or_else(|| blueprint.id.clone())
            .unwrap_or_else(|| format!("bp-{}", blueprint.name)))
    }

    async fn create_service(&self, blueprint_id: &str, _ttl: Duration) -> Result<String> {
        self.record(Call::CreateService {
            node: self.peer(),
            blueprint_id: blueprint_id.to_string(),
        })?;
        Ok(format!("svc-{}", blueprint_id))
    }

    async fn get_modules(&self, _ttl: Duration) -> Result<Value> {
        self.record(Call::GetModules { node: self.peer() })?;
        Ok(json!([]))
    }

    async fn get_interfaces(&self, _ttl: Duration) -> Result<Value> {
        self.record(Call::GetInterfaces { node: self.peer() })?;
        Ok(json!([]))
    }

    async fn get_interface(&self, service_id: &str, _ttl: Duration) -> Result<Value> {
        self.record(Call::GetInterface {
            node: self.peer(),
            service_id: service_id.to_string(),
        })?;
        Ok(json!({ "service_id": service_id }))
    }

    fn subscribe(&self, correlation_id: &str) -> oneshot::Receiver<CallbackDelivery> {
        self.callbacks.register(correlation_id)
    }

    fn cancel_callback(&self, correlation_id: &str) {
        self.callbacks.cancel(correlation_id);
    }

    async fn send_script(&self, request: SendScript) -> Result<String> {
        self.record(Call::SendScript {
            node: self.peer(),
            script: request.script.clone(),
            data: request.data.clone(),
            callback: request.callback.to_string(),
        })?;

        let (silent, args) = {
            let state = self.state.lock().unwrap();
            (state.silent_scripts, state.callback_args.clone())
        };
        if !silent {
            let args = args.unwrap_or_else(|| vec![Value::Object(request.data.clone())]);
            self.callbacks
                .deliver(&request.correlation_id, CallbackDelivery { args });
        }

        Ok(format!("particle-{}", self.call_count("send_script")))
    }

    async fn add_script(&self, script: &str, interval_sec: u64, _ttl: Duration) -> Result<String> {
        self.record(Call::AddScript {
            node: self.peer(),
            script: script.to_string(),
            interval_sec,
        })?;
        Ok(format!("script-{}", self.call_count("add_script")))
    }
}
