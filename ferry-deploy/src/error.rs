//! Error types for the deployment engine

use ferry_client::ClientError;
use std::path::PathBuf;
use thiserror::Error;

use crate::loader::LoadError;
use crate::template::TemplateError;
use crate::validator::ValidationError;

/// Result type alias for deployment operations
pub type Result<T> = std::result::Result<T, DeployError>;

/// Errors that abort a deployment
///
/// Every variant is fatal. Progress made on remote nodes before the error is
/// kept as is and no output is written.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Failed to read descriptor {path}: {source}")]
    ReadDescriptor {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Descriptor is not valid JSON: {0}")]
    ParseDescriptor(#[source] serde_json::Error),

    #[error("Invalid descriptor: {0}")]
    Validation(#[from] ValidationError),

    #[error("Service '{service}' depends on module '{module}', which is not declared in modules")]
    UnresolvedDependency { service: String, module: String },

    #[error("Failed to load content: {0}")]
    ContentLoad(#[from] LoadError),

    #[error("{operation} failed on node {node}: {source}")]
    RemoteCall {
        operation: &'static str,
        node: String,
        #[source]
        source: ClientError,
    },

    #[error("Failed to render script '{script}': {source}")]
    TemplateRender {
        script: String,
        #[source]
        source: TemplateError,
    },

    #[error("Node {0} is not part of the selected environment")]
    UnknownNode(String),

    #[error("Blueprint '{0}' is not part of the distribution catalog")]
    UnknownBlueprint(String),

    #[error("Node index {index} is out of range (environment has {len} nodes)")]
    NodeIndexOutOfRange { index: usize, len: usize },

    #[error("Module '{0}' is listed more than once in a concurrent upload")]
    DuplicateModule(String),

    #[error("Script '{0}' was dropped before it called back")]
    CallbackDropped(String),

    #[error("Script '{script}' did not call back within {seconds}s")]
    ScriptTimeout { script: String, seconds: u64 },

    #[error("Failed to write output {path}: {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialise deployment output: {0}")]
    Serialisation(#[source] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl DeployError {
    /// Wraps a client error with the operation and node it came from
    #[must_use]
    pub fn remote(operation: &'static str, node: impl Into<String>, source: ClientError) -> Self {
        Self::RemoteCall {
            operation,
            node: node.into(),
            source,
        }
    }
}
