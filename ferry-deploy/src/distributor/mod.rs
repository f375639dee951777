//! Artifact distribution
//!
//! The distributor owns everything a run shares across remote calls: one
//! connection per node, opened on first use, and the session caches that keep
//! modules and blueprints from being uploaded to the same node twice.
//!
//! Module and blueprint uploads are retried with the configured
//! [`RetryPolicy`](crate::retry::RetryPolicy). Every other call is attempted
//! once.

mod cache;
mod fanout;
mod script;

#[cfg(test)]
pub(crate) mod mock;

pub use cache::{UploadCache, UploadKey};
pub use fanout::{
    BlueprintTemplate, DistributedService, DistributionCatalog, DistributionFailure,
    DistributionManifest, DistributionReport,
};
pub use script::{ScriptDialect, ScriptHandle};

use ferry_client::{ClientError, Connector, NodeConnection};
use ferry_core::domain::blueprint::Blueprint;
use ferry_core::domain::module::ModuleArtifact;
use ferry_core::domain::node::Node;
use futures::future::try_join_all;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::DeployConfig;
use crate::error::{DeployError, Result};
use crate::retry::retry_with;

/// Uploads artifacts to nodes and creates services from them
pub struct Distributor {
    connector: Arc<dyn Connector>,
    config: DeployConfig,
    connections: Mutex<HashMap<String, Arc<dyn NodeConnection>>>,
    modules: Mutex<UploadCache>,
    blueprints: Mutex<UploadCache>,
}

impl Distributor {
    pub fn new(connector: Arc<dyn Connector>, config: DeployConfig) -> Self {
        Self {
            connector,
            config,
            connections: Mutex::new(HashMap::new()),
            modules: Mutex::new(UploadCache::new()),
            blueprints: Mutex::new(UploadCache::new()),
        }
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Returns the connection to `node`, opening it on first use
    pub async fn connection(&self, node: &Node) -> Result<Arc<dyn NodeConnection>> {
        let mut connections = self.connections.lock().await;
        if let Some(conn) = connections.get(&node.peer_id) {
            return Ok(conn.clone());
        }

        let conn = self
            .connector
            .connect(node)
            .await
            .map_err(|e| DeployError::remote("connect", &node.peer_id, e))?;
        connections.insert(node.peer_id.clone(), conn.clone());
        Ok(conn)
    }

    // =============================================================================
    // Modules
    // =============================================================================

    /// Hash of a module already uploaded to `node` during this run
    pub async fn uploaded_module_hash(&self, node: &Node, name: &str) -> Option<String> {
        self.modules
            .lock()
            .await
            .get(&node.peer_id, name)
            .map(str::to_string)
    }

    /// Uploads a module unless one with the same name already went to `node`
    ///
    /// # Returns
    /// The module's content hash, from the node or from the session cache
    pub async fn upload_module(&self, node: &Node, module: &ModuleArtifact) -> Result<String> {
        if let Some(hash) = self.uploaded_module_hash(node, module.name()).await {
            debug!(
                "Module '{}' already uploaded to {}, reusing hash {}",
                module.name(),
                node,
                hash
            );
            return Ok(hash);
        }

        let conn = self.connection(node).await?;
        info!("Uploading module '{}' to {}", module.name(), node);
        debug!(
            "Module config: {}",
            serde_json::to_string(&module.config).unwrap_or_default()
        );

        let hash = retry_with(
            &self.config.retry,
            "upload_module",
            || conn.upload_module(module, self.config.ttl),
            ClientError::is_retryable,
        )
        .await
        .map_err(|e| DeployError::remote("upload_module", &node.peer_id, e))?;

        self.modules
            .lock()
            .await
            .record(&node.peer_id, module.name(), hash.as_str());
        Ok(hash)
    }

    /// Uploads modules with distinct names to one node concurrently
    ///
    /// Duplicate names are rejected before any call is made.
    ///
    /// # Returns
    /// The hashes, in the order of `modules`
    pub async fn upload_modules_concurrently(
        &self,
        node: &Node,
        modules: &[ModuleArtifact],
    ) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        if let Some(duplicate) = modules.iter().find(|m| !seen.insert(m.name())) {
            return Err(DeployError::DuplicateModule(duplicate.name().to_string()));
        }

        try_join_all(modules.iter().map(|module| self.upload_module(node, module))).await
    }

    // =============================================================================
    // Blueprints & Services
    // =============================================================================

    /// Registers a blueprint on `node`
    ///
    /// A pinned id the node does not honour is logged and the node's id is
    /// returned.
    pub async fn upload_blueprint(&self, node: &Node, blueprint: &Blueprint) -> Result<String> {
        let conn = self.connection(node).await?;
        info!("Uploading blueprint '{}' to {}", blueprint.name, node);

        let id = retry_with(
            &self.config.retry,
            "upload_blueprint",
            || conn.add_blueprint(blueprint, self.config.ttl),
            ClientError::is_retryable,
        )
        .await
        .map_err(|e| DeployError::remote("upload_blueprint", &node.peer_id, e))?;

        if let Some(pinned) = blueprint.id.as_deref().filter(|pinned| *pinned != id) {
            warn!(
                "Blueprint '{}' was requested with id {} but {} assigned {}",
                blueprint.name, pinned, node, id
            );
        }

        Ok(id)
    }

    /// Instantiates a service from a blueprint on `node`
    pub async fn create_service(&self, node: &Node, blueprint_id: &str) -> Result<String> {
        let conn = self.connection(node).await?;
        let id = conn
            .create_service(blueprint_id, self.config.ttl)
            .await
            .map_err(|e| DeployError::remote("create_service", &node.peer_id, e))?;

        info!("Service {} created on {} from blueprint {}", id, node, blueprint_id);
        Ok(id)
    }

    // =============================================================================
    // Queries
    // =============================================================================

    pub async fn fetch_modules(&self, node: &Node) -> Result<Value> {
        let conn = self.connection(node).await?;
        conn.get_modules(self.config.ttl)
            .await
            .map_err(|e| DeployError::remote("get_modules", &node.peer_id, e))
    }

    pub async fn fetch_interfaces(&self, node: &Node) -> Result<Value> {
        let conn = self.connection(node).await?;
        conn.get_interfaces(self.config.ttl)
            .await
            .map_err(|e| DeployError::remote("get_interfaces", &node.peer_id, e))
    }

    pub async fn fetch_interface(&self, node: &Node, service_id: &str) -> Result<Value> {
        let conn = self.connection(node).await?;
        conn.get_interface(service_id, self.config.ttl)
            .await
            .map_err(|e| DeployError::remote("get_interface", &node.peer_id, e))
    }
}
