//! Deployment pipeline
//!
//! Runs a descriptor through its stages in order:
//!
//! 1. validate the document
//! 2. provision services (modules, blueprint, service) in declaration order
//! 3. compute the deployment variables
//! 4. run one-shot scripts, one at a time
//! 5. register persistent scripts
//! 6. write the annotated descriptor
//!
//! The descriptor itself is never modified. Everything the network hands back
//! is collected in a [`DeploymentResult`] and merged into the output at the
//! end. Any error stops the run, leaves remote state as it is and skips the
//! output file.

use ferry_core::domain::OrderedMap;
use ferry_core::domain::blueprint::{Blueprint, hash_reference};
use ferry_core::domain::descriptor::{ContentSource, DeploymentDescriptor};
use ferry_core::domain::module::{ModuleArtifact, ModuleConfig};
use ferry_core::domain::node::Node;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use tracing::{debug, error, info};

use crate::distributor::{Distributor, ScriptDialect};
use crate::error::{DeployError, Result};
use crate::loader::ContentLoader;
use crate::template;
use crate::validator::{self, ValidationError};

/// Suffix of the variable holding a service's node
pub const NODE_VARIABLE_SUFFIX: &str = "__node";

/// Where a pipeline run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentStage {
    Pending,
    Validated,
    ServicesProvisioned,
    VariablesComputed,
    ScriptsRun,
    PersistentScriptsRegistered,
    Written,
    Failed,
}

impl fmt::Display for DeploymentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentStage::Pending => "pending",
            DeploymentStage::Validated => "validated",
            DeploymentStage::ServicesProvisioned => "services provisioned",
            DeploymentStage::VariablesComputed => "variables computed",
            DeploymentStage::ScriptsRun => "scripts run",
            DeploymentStage::PersistentScriptsRegistered => "persistent scripts registered",
            DeploymentStage::Written => "written",
            DeploymentStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What the network assigned to a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRecord {
    pub node: String,
    pub hash_dependencies: Vec<String>,
    pub blueprint_id: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleRecord {
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageRecord {
    pub id: String,
}

/// Values derived during a run, kept apart from the descriptor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentResult {
    pub services: OrderedMap<ServiceRecord>,
    pub modules: OrderedMap<ModuleRecord>,
    pub script_storage: OrderedMap<StorageRecord>,
    /// `<service>` and `<service>__node` for every service
    pub variables: Map<String, Value>,
}

/// Builds the output document: the normalised descriptor with every entry
/// extended by what the network assigned to it
pub fn annotate(descriptor: &DeploymentDescriptor, result: &DeploymentResult) -> Result<Value> {
    let mut output = serde_json::to_value(descriptor).map_err(DeployError::Serialisation)?;

    merge_section(&mut output, "services", &result.services)?;
    merge_section(&mut output, "modules", &result.modules)?;
    merge_section(&mut output, "script_storage", &result.script_storage)?;

    Ok(output)
}

fn merge_section<T: Serialize>(
    output: &mut Value,
    section: &str,
    records: &OrderedMap<T>,
) -> Result<()> {
    for (name, record) in records.iter() {
        let fields = serde_json::to_value(record).map_err(DeployError::Serialisation)?;
        let (Some(entry), Value::Object(fields)) = (
            output
                .get_mut(section)
                .and_then(|s| s.get_mut(name))
                .and_then(Value::as_object_mut),
            fields,
        ) else {
            continue;
        };
        entry.extend(fields);
    }
    Ok(())
}

/// Serialises `value` as JSON indented by four spaces
pub fn to_output_json(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut serializer)
        .map_err(DeployError::Serialisation)?;
    buf.push(b'\n');
    Ok(buf)
}

/// One deployment run
pub struct Pipeline<'a> {
    distributor: &'a Distributor,
    loader: ContentLoader,
    relay: Node,
    nodes: Vec<Node>,
    dialect: ScriptDialect,
    stage: DeploymentStage,
    result: DeploymentResult,
}

impl<'a> Pipeline<'a> {
    /// Creates a pipeline
    ///
    /// # Arguments
    /// * `distributor` - Performs every remote call
    /// * `loader` - Resolves module and script sources
    /// * `relay` - Node one-shot scripts are sent to
    /// * `nodes` - Nodes descriptor entries may target, besides the relay
    pub fn new(
        distributor: &'a Distributor,
        loader: ContentLoader,
        relay: Node,
        nodes: Vec<Node>,
    ) -> Self {
        Self {
            distributor,
            loader,
            relay,
            nodes,
            dialect: ScriptDialect::default(),
            stage: DeploymentStage::Pending,
            result: DeploymentResult::default(),
        }
    }

    pub fn with_dialect(mut self, dialect: ScriptDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn stage(&self) -> DeploymentStage {
        self.stage
    }

    pub fn result(&self) -> &DeploymentResult {
        &self.result
    }

    /// Runs every stage up to, not including, writing the output
    ///
    /// # Returns
    /// The annotated descriptor
    pub async fn run(&mut self, raw: &Value) -> Result<Value> {
        match self.execute(raw).await {
            Ok(output) => Ok(output),
            Err(e) => {
                error!("Deployment failed after stage '{}': {}", self.stage, e);
                self.stage = DeploymentStage::Failed;
                Err(e)
            }
        }
    }

    /// Writes the annotated descriptor produced by [`Pipeline::run`]
    pub fn write(&mut self, output: &Value, path: &Path) -> Result<()> {
        let bytes = to_output_json(output)?;
        std::fs::write(path, bytes).map_err(|source| {
            self.stage = DeploymentStage::Failed;
            DeployError::WriteOutput {
                path: path.to_path_buf(),
                source,
            }
        })?;

        self.stage = DeploymentStage::Written;
        info!("Deployment written to {}", path.display());
        Ok(())
    }

    async fn execute(&mut self, raw: &Value) -> Result<Value> {
        self.result = DeploymentResult::default();
        let descriptor = validator::validate(raw)?;
        check_variable_names(&descriptor)?;
        self.advance(DeploymentStage::Validated);

        self.provision_services(&descriptor).await?;
        self.advance(DeploymentStage::ServicesProvisioned);

        self.compute_variables();
        self.advance(DeploymentStage::VariablesComputed);

        self.run_scripts(&descriptor).await?;
        self.advance(DeploymentStage::ScriptsRun);

        self.register_persistent_scripts(&descriptor).await?;
        self.advance(DeploymentStage::PersistentScriptsRegistered);

        annotate(&descriptor, &self.result)
    }

    fn advance(&mut self, stage: DeploymentStage) {
        info!("Deployment stage: {}", stage);
        self.stage = stage;
    }

    /// Finds the node a descriptor entry targets
    fn resolve_node(&self, peer_id: &str) -> Result<Node> {
        if self.relay.peer_id == peer_id {
            return Ok(self.relay.clone());
        }
        self.nodes
            .iter()
            .find(|node| node.peer_id == peer_id)
            .cloned()
            .ok_or_else(|| DeployError::UnknownNode(peer_id.to_string()))
    }

    // =============================================================================
    // Services
    // =============================================================================

    async fn provision_services(&mut self, descriptor: &DeploymentDescriptor) -> Result<()> {
        for (name, spec) in descriptor.services.iter() {
            let node = self.resolve_node(&spec.node)?;
            info!("Provisioning service '{}' on {}", name, node);

            let mut hash_dependencies = Vec::with_capacity(spec.dependencies.len());
            for dep in &spec.dependencies {
                let hash = self.provision_module(descriptor, name, dep, &node).await?;
                hash_dependencies.push(hash_reference(&hash));
            }

            let blueprint = Blueprint::new(name, hash_dependencies.clone());
            let blueprint_id = self.distributor.upload_blueprint(&node, &blueprint).await?;
            let id = self.distributor.create_service(&node, &blueprint_id).await?;

            self.result.services.insert(
                name,
                ServiceRecord {
                    node: node.peer_id.clone(),
                    hash_dependencies,
                    blueprint_id,
                    id,
                },
            );
        }
        Ok(())
    }

    /// Uploads one dependency of `service` unless it is already on `node`
    async fn provision_module(
        &mut self,
        descriptor: &DeploymentDescriptor,
        service: &str,
        dep: &str,
        node: &Node,
    ) -> Result<String> {
        let spec = descriptor
            .modules
            .get(dep)
            .ok_or_else(|| DeployError::UnresolvedDependency {
                service: service.to_string(),
                module: dep.to_string(),
            })?;
        let config = ModuleConfig::from_spec(dep, &spec.config);

        let hash = match self.distributor.uploaded_module_hash(node, &config.name).await {
            Some(hash) => {
                debug!("Module '{}' already on {}, skipping load", dep, node);
                hash
            }
            None => {
                let source = require_source(spec.source(), "modules", dep)?;
                let bytes = self.loader.load(&source).await?;
                self.distributor
                    .upload_module(node, &ModuleArtifact::new(config, bytes))
                    .await?
            }
        };

        self.result
            .modules
            .insert(dep, ModuleRecord { hash: hash.clone() });
        Ok(hash)
    }

    // =============================================================================
    // Variables & Scripts
    // =============================================================================

    fn compute_variables(&mut self) {
        let mut variables = Map::new();
        for (name, record) in self.result.services.iter() {
            variables.insert(name.to_string(), Value::String(record.id.clone()));
            variables.insert(
                format!("{}{}", name, NODE_VARIABLE_SUFFIX),
                Value::String(record.node.clone()),
            );
        }
        let shown = Value::Object(variables.clone());
        debug!("Deployment variables: {}", shown);
        self.result.variables = variables;
    }

    async fn run_scripts(&mut self, descriptor: &DeploymentDescriptor) -> Result<()> {
        let timeout = self.distributor.config().script_timeout;

        for (name, spec) in descriptor.scripts.iter() {
            let source = require_source(spec.source(), "scripts", name)?;
            let text = self.loader.load_text(name, &source).await?;

            let mut data = self.result.variables.clone();
            if let Some(overrides) = &spec.variables {
                data.extend(overrides.clone());
            }

            let handle = self
                .distributor
                .run_script(&self.relay, name, &text, data, self.dialect)
                .await?;
            let delivery = handle.wait(timeout).await?;
            info!(
                "Script '{}' called back with {} argument(s)",
                name,
                delivery.args.len()
            );
            debug!("Script '{}' result: {:?}", name, delivery.args);
        }
        Ok(())
    }

    async fn register_persistent_scripts(
        &mut self,
        descriptor: &DeploymentDescriptor,
    ) -> Result<()> {
        for (name, spec) in descriptor.script_storage.iter() {
            let node = self.resolve_node(&spec.node)?;
            let source = require_source(spec.source(), "script_storage", name)?;
            let text = self.loader.load_text(name, &source).await?;

            let script = template::render(&text, &self.result.variables).map_err(|source| {
                DeployError::TemplateRender {
                    script: name.to_string(),
                    source,
                }
            })?;

            let id = self
                .distributor
                .register_persistent_script(&node, &script, spec.interval)
                .await?;
            self.result.script_storage.insert(name, StorageRecord { id });
        }
        Ok(())
    }
}

fn require_source(
    source: Option<ContentSource>,
    section: &str,
    name: &str,
) -> Result<ContentSource> {
    source.ok_or_else(|| {
        ValidationError::new(
            format!("{}.{}", section, name),
            "must specify at least one of 'file' or 'url'",
        )
        .into()
    })
}

/// Rejects services whose id variable would shadow another service's node
/// variable
fn check_variable_names(descriptor: &DeploymentDescriptor) -> Result<()> {
    for name in descriptor.services.keys() {
        if let Some(owner) = name.strip_suffix(NODE_VARIABLE_SUFFIX)
            && descriptor.services.contains_key(owner)
        {
            return Err(ValidationError::new(
                format!("services.{}", name),
                format!("clashes with the node variable of service '{}'", owner),
            )
            .into());
        }
    }
    Ok(())
}

/// Reads, deploys and writes a descriptor file
///
/// # Arguments
/// * `distributor` - Performs every remote call
/// * `relay` - Node scripts are sent to
/// * `nodes` - The selected environment's nodes
/// * `descriptor_path` - Descriptor to deploy; relative sources resolve
///   against its directory
/// * `output_path` - Where the annotated descriptor is written
/// * `dialect` - Conventions of the descriptor's scripts
pub async fn deploy(
    distributor: &Distributor,
    relay: &Node,
    nodes: &[Node],
    descriptor_path: &Path,
    output_path: &Path,
    dialect: ScriptDialect,
) -> Result<DeploymentResult> {
    let text =
        std::fs::read_to_string(descriptor_path).map_err(|source| DeployError::ReadDescriptor {
            path: descriptor_path.to_path_buf(),
            source,
        })?;
    let raw: Value = serde_json::from_str(&text).map_err(DeployError::ParseDescriptor)?;

    let mut pipeline = Pipeline::new(
        distributor,
        ContentLoader::for_descriptor(descriptor_path),
        relay.clone(),
        nodes.to_vec(),
    )
    .with_dialect(dialect);

    let output = pipeline.run(&raw).await?;
    pipeline.write(&output, output_path)?;
    Ok(pipeline.result().clone())
}
