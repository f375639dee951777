//! Node connections
//!
//! A connection is the session a client holds with one node. The deployment
//! engine only depends on the [`NodeConnection`] and [`Connector`] traits so
//! that tests can swap the network out for a recording double.

use async_trait::async_trait;
use ferry_core::domain::blueprint::Blueprint;
use ferry_core::domain::module::ModuleArtifact;
use ferry_core::domain::node::Node;
use ferry_core::dto::script::{CallbackDelivery, SendScript};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::callbacks::CallbackRegistry;
use crate::error::Result;
use crate::identity::ClientIdentity;
use crate::NodeClient;

/// Delay between two callback polls unless configured otherwise
pub const DEFAULT_CALLBACK_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Remote operations available on a connected node
#[async_trait]
pub trait NodeConnection: Send + Sync {
    /// The node this connection talks to
    fn node(&self) -> &Node;

    /// Uploads a module and returns its content hash
    async fn upload_module(&self, module: &ModuleArtifact, ttl: Duration) -> Result<String>;

    /// Registers a blueprint and returns the id the node assigned
    async fn add_blueprint(&self, blueprint: &Blueprint, ttl: Duration) -> Result<String>;

    /// Creates a service instance and returns its id
    async fn create_service(&self, blueprint_id: &str, ttl: Duration) -> Result<String>;

    async fn get_modules(&self, ttl: Duration) -> Result<Value>;

    async fn get_interfaces(&self, ttl: Duration) -> Result<Value>;

    async fn get_interface(&self, service_id: &str, ttl: Duration) -> Result<Value>;

    /// Registers a one-shot callback under `correlation_id`
    ///
    /// Must be called before the script that answers it is sent.
    fn subscribe(&self, correlation_id: &str) -> oneshot::Receiver<CallbackDelivery>;

    /// Drops a callback registration; its receiver observes a closed channel
    fn cancel_callback(&self, correlation_id: &str);

    /// Sends a script for a single execution and returns the particle id
    async fn send_script(&self, request: SendScript) -> Result<String>;

    /// Stores a script for periodic execution and returns its id
    async fn add_script(&self, script: &str, interval_sec: u64, ttl: Duration) -> Result<String>;
}

/// Opens connections to nodes
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, node: &Node) -> Result<Arc<dyn NodeConnection>>;
}

/// Connector speaking the node's HTTP RPC
#[derive(Debug, Clone)]
pub struct HttpConnector {
    identity: ClientIdentity,
    poll_interval: Duration,
}

impl HttpConnector {
    pub fn new(identity: ClientIdentity) -> Self {
        Self {
            identity,
            poll_interval: DEFAULT_CALLBACK_POLL_INTERVAL,
        }
    }

    /// Sets the delay between two callback polls
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self, node: &Node) -> Result<Arc<dyn NodeConnection>> {
        let endpoint = node.endpoint()?;
        info!("Connecting to node {} at {}", node.peer_id, endpoint);

        Ok(Arc::new(HttpConnection {
            node: node.clone(),
            client: NodeClient::new(endpoint, &self.identity),
            callbacks: CallbackRegistry::new(),
            poll_interval: self.poll_interval,
        }))
    }
}

/// HTTP session with one node
///
/// Callbacks are collected by a background task per sent script which polls
/// the node until the callback arrives or nobody is waiting for it anymore.
pub struct HttpConnection {
    node: Node,
    client: NodeClient,
    callbacks: CallbackRegistry,
    poll_interval: Duration,
}

impl HttpConnection {
    fn spawn_callback_poller(&self, correlation_id: String, ttl: Duration) {
        let client = self.client.clone();
        let callbacks = self.callbacks.clone();
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            while callbacks.is_pending(&correlation_id) {
                match client.poll_callback(&correlation_id, ttl).await {
                    Ok(Some(delivery)) => {
                        debug!(
                            "Callback {} delivered with {} args",
                            correlation_id,
                            delivery.args.len()
                        );
                        callbacks.deliver(&correlation_id, delivery);
                        return;
                    }
                    Ok(None) => {}
                    Err(e) if e.is_retryable() => {
                        warn!("Polling callback {} failed: {}", correlation_id, e);
                    }
                    Err(e) => {
                        warn!("Giving up on callback {}: {}", correlation_id, e);
                        callbacks.cancel(&correlation_id);
                        return;
                    }
                }
                tokio::time::sleep(poll_interval).await;
            }
            debug!("Stopped polling callback {}", correlation_id);
        });
    }
}

#[async_trait]
impl NodeConnection for HttpConnection {
    fn node(&self) -> &Node {
        &self.node
    }

    async fn upload_module(&self, module: &ModuleArtifact, ttl: Duration) -> Result<String> {
        self.client.upload_module(module, ttl).await
    }

    async fn add_blueprint(&self, blueprint: &Blueprint, ttl: Duration) -> Result<String> {
        self.client.add_blueprint(blueprint, ttl).await
    }

    async fn create_service(&self, blueprint_id: &str, ttl: Duration) -> Result<String> {
        self.client.create_service(blueprint_id, ttl).await
    }

    async fn get_modules(&self, ttl: Duration) -> Result<Value> {
        self.client.get_modules(ttl).await
    }

    async fn get_interfaces(&self, ttl: Duration) -> Result<Value> {
        self.client.get_interfaces(ttl).await
    }

    async fn get_interface(&self, service_id: &str, ttl: Duration) -> Result<Value> {
        self.client.get_interface(service_id, ttl).await
    }

    fn subscribe(&self, correlation_id: &str) -> oneshot::Receiver<CallbackDelivery> {
        self.callbacks.register(correlation_id)
    }

    fn cancel_callback(&self, correlation_id: &str) {
        self.callbacks.cancel(correlation_id);
    }

    async fn send_script(&self, request: SendScript) -> Result<String> {
        let particle_id = self.client.send_script(&request).await?;
        self.spawn_callback_poller(
            request.correlation_id,
            Duration::from_millis(request.ttl_ms),
        );
        Ok(particle_id)
    }

    async fn add_script(&self, script: &str, interval_sec: u64, ttl: Duration) -> Result<String> {
        self.client.add_script(script, interval_sec, ttl).await
    }
}
