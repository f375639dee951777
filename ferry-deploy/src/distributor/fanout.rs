//! Blueprint fan-out
//!
//! Places a catalog of blueprints on many nodes at once. Each blueprint name
//! is assigned a list of node indices; for every (blueprint, node) pair the
//! blueprint's modules are uploaded, the blueprint registered and a service
//! created. A failing pair is reported and the remaining pairs still run.

use ferry_core::domain::OrderedMap;
use ferry_core::domain::blueprint::{Blueprint, hash_reference};
use ferry_core::domain::descriptor::ModuleSpec;
use ferry_core::domain::module::{ModuleArtifact, ModuleConfig};
use ferry_core::domain::node::Node;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::Distributor;
use crate::error::{DeployError, Result};
use crate::loader::ContentLoader;
use crate::validator::ValidationError;

/// A blueprint as declared in a distribution manifest, keyed by its name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlueprintTemplate {
    /// Module names, in linking order
    pub dependencies: Vec<String>,

    /// Id to request from every node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// The file format listing what `distribute` may place
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DistributionManifest {
    pub modules: OrderedMap<ModuleSpec>,
    pub blueprints: OrderedMap<BlueprintTemplate>,
}

impl DistributionManifest {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(DeployError::ParseDescriptor)
    }
}

/// Loaded modules and the blueprints built from them
#[derive(Debug, Clone, Default)]
pub struct DistributionCatalog {
    pub modules: Vec<ModuleArtifact>,
    pub blueprints: OrderedMap<BlueprintTemplate>,
}

impl DistributionCatalog {
    /// Loads every module a manifest declares
    pub async fn load(manifest: &DistributionManifest, loader: &ContentLoader) -> Result<Self> {
        let mut modules = Vec::with_capacity(manifest.modules.len());
        for (key, spec) in manifest.modules.iter() {
            let source = spec.source().ok_or_else(|| {
                ValidationError::new(
                    format!("modules.{}", key),
                    "must specify at least one of 'file' or 'url'",
                )
            })?;
            let bytes = loader.load(&source).await?;
            modules.push(ModuleArtifact::new(
                ModuleConfig::from_spec(key, &spec.config),
                bytes,
            ));
        }

        Ok(Self {
            modules,
            blueprints: manifest.blueprints.clone(),
        })
    }

    pub fn module(&self, name: &str) -> Option<&ModuleArtifact> {
        self.modules.iter().find(|m| m.name() == name)
    }
}

/// A service created by `distribute`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributedService {
    pub blueprint: String,
    pub node: String,
    pub blueprint_id: String,
    pub service_id: String,
}

/// A (blueprint, node) pair that could not be deployed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionFailure {
    pub blueprint: String,
    pub node: String,
    pub error: String,
}

/// Outcome of a fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DistributionReport {
    pub created: Vec<DistributedService>,
    pub failed: Vec<DistributionFailure>,
}

impl DistributionReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl Distributor {
    // =============================================================================
    // Fan-out
    // =============================================================================

    /// Places blueprints on the nodes they are assigned to
    ///
    /// # Arguments
    /// * `relay` - Node the client is attached to; it must be reachable
    /// * `nodes` - The environment's nodes, addressed by index
    /// * `assignment` - Blueprint name to node indices
    /// * `catalog` - Available blueprints and modules
    ///
    /// Unknown blueprints, undeclared modules and out of range indices are
    /// rejected before anything is sent.
    pub async fn distribute(
        &self,
        relay: &Node,
        nodes: &[Node],
        assignment: &OrderedMap<Vec<usize>>,
        catalog: &DistributionCatalog,
    ) -> Result<DistributionReport> {
        for (name, indices) in assignment.iter() {
            let template = catalog
                .blueprints
                .get(name)
                .ok_or_else(|| DeployError::UnknownBlueprint(name.to_string()))?;

            if let Some(missing) = template
                .dependencies
                .iter()
                .find(|dep| catalog.module(dep).is_none())
            {
                return Err(DeployError::UnresolvedDependency {
                    service: name.to_string(),
                    module: missing.clone(),
                });
            }

            if let Some(&index) = indices.iter().find(|&&i| i >= nodes.len()) {
                return Err(DeployError::NodeIndexOutOfRange {
                    index,
                    len: nodes.len(),
                });
            }
        }

        self.connection(relay).await?;

        let mut report = DistributionReport::default();
        for (name, indices) in assignment.iter() {
            for &index in indices {
                let Some(node) = nodes.get(index) else {
                    continue;
                };

                match self.place_blueprint(node, name, catalog).await {
                    Ok(service) => {
                        info!(
                            "Service {} created as instance of {}@{} on {}",
                            service.service_id, name, service.blueprint_id, node
                        );
                        report.created.push(service);
                    }
                    Err(e) => {
                        error!("Failed to place blueprint '{}' on {}: {}", name, node, e);
                        report.failed.push(DistributionFailure {
                            blueprint: name.to_string(),
                            node: node.peer_id.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        Ok(report)
    }

    async fn place_blueprint(
        &self,
        node: &Node,
        name: &str,
        catalog: &DistributionCatalog,
    ) -> Result<DistributedService> {
        let template = catalog
            .blueprints
            .get(name)
            .ok_or_else(|| DeployError::UnknownBlueprint(name.to_string()))?;

        let mut dependencies = Vec::with_capacity(template.dependencies.len());
        for dep in &template.dependencies {
            let module = catalog.module(dep).ok_or_else(|| DeployError::UnresolvedDependency {
                service: name.to_string(),
                module: dep.clone(),
            })?;
            let hash = self.upload_module(node, module).await?;
            dependencies.push(hash_reference(&hash));
        }

        let cached = self
            .blueprints
            .lock()
            .await
            .get(&node.peer_id, name)
            .map(str::to_string);
        let blueprint_id = match cached {
            Some(id) => id,
            None => {
                let mut blueprint = Blueprint::new(name, dependencies);
                blueprint.id = template.id.clone();
                let id = self.upload_blueprint(node, &blueprint).await?;
                self.blueprints
                    .lock()
                    .await
                    .record(&node.peer_id, name, id.as_str());
                id
            }
        };

        let service_id = self.create_service(node, &blueprint_id).await?;
        Ok(DistributedService {
            blueprint: name.to_string(),
            node: node.peer_id.clone(),
            blueprint_id,
            service_id,
        })
    }
}
