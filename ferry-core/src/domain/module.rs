//! Module domain types
//!
//! `ModuleConfigSpec` is the optional configuration block a descriptor attaches
//! to a module. `ModuleConfig` is the complete configuration sent to a node
//! with the module bytes.

use serde::{Deserialize, Serialize};

use crate::domain::OrderedMap;

/// Linear memory pages granted to a module unless configured otherwise
pub const DEFAULT_MEM_PAGES_COUNT: u32 = 100;

/// Module configuration as written in a descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleConfigSpec {
    /// Guest directory name mapped to a host path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_dirs: Option<OrderedMap<String>>,

    /// Binary name made callable by the module, mapped to its host path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mounted_binaries: Option<OrderedMap<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preopened_files: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_pages_count: Option<u32>,

    /// Name registered on the node, overriding the descriptor key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Configuration sent to a node alongside the module bytes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub name: String,
    pub mem_pages_count: u32,
    pub logger_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mounted_binaries: Option<OrderedMap<String>>,
    pub wasi: WasiConfig,
}

/// WASI sandbox settings for a module
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WasiConfig {
    pub preopened_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_dirs: Option<OrderedMap<String>>,
}

impl ModuleConfig {
    /// Creates a configuration with defaults for everything but the name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mem_pages_count: DEFAULT_MEM_PAGES_COUNT,
            logger_enabled: true,
            mounted_binaries: None,
            wasi: WasiConfig::default(),
        }
    }

    /// Builds the node-side configuration for a descriptor module
    ///
    /// # Arguments
    /// * `key` - The module's descriptor key, used when no name override is set
    /// * `spec` - The descriptor's configuration block
    pub fn from_spec(key: &str, spec: &ModuleConfigSpec) -> Self {
        Self {
            name: spec.name.clone().unwrap_or_else(|| key.to_string()),
            mem_pages_count: spec.mem_pages_count.unwrap_or(DEFAULT_MEM_PAGES_COUNT),
            logger_enabled: true,
            mounted_binaries: spec.mounted_binaries.clone(),
            wasi: WasiConfig {
                preopened_files: spec.preopened_files.clone().unwrap_or_default(),
                mapped_dirs: spec.mapped_dirs.clone(),
            },
        }
    }
}

/// A module ready for upload: its configuration and raw bytes
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleArtifact {
    pub config: ModuleConfig,
    pub bytes: Vec<u8>,
}

impl ModuleArtifact {
    pub fn new(config: ModuleConfig, bytes: Vec<u8>) -> Self {
        Self { config, bytes }
    }

    /// The name the module is registered under on a node
    pub fn name(&self) -> &str {
        &self.config.name
    }
}
