//! Deployment descriptor domain types
//!
//! A descriptor declares the services to create, the modules they are built
//! from, the scripts to run once services exist and the scripts to register for
//! periodic execution. Sections are ordered: the deployment processes entries in
//! the order they were declared.

use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::domain::OrderedMap;
use crate::domain::module::ModuleConfigSpec;

/// Interval used when a script storage entry does not specify one
pub const DEFAULT_SCRIPT_INTERVAL_SECS: u64 = 3;

/// Smallest interval a script storage entry may request
pub const MIN_SCRIPT_INTERVAL_SECS: u64 = 3;

/// Top-level sections a descriptor may contain
pub const DESCRIPTOR_SECTIONS: [&str; 4] = ["services", "modules", "scripts", "script_storage"];

/// A complete deployment descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentDescriptor {
    pub services: OrderedMap<ServiceSpec>,
    pub modules: OrderedMap<ModuleSpec>,
    pub scripts: OrderedMap<ScriptSpec>,
    pub script_storage: OrderedMap<ScriptStorageSpec>,
}

/// A service to create on a node from a list of modules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSpec {
    /// Peer id of the node that hosts the service
    pub node: String,

    /// Names of the modules the service is built from, in linking order
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// A deployable module and its runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default)]
    pub config: ModuleConfigSpec,
}

/// A script executed once after all services are created
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Variables merged over the computed deployment variables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Map<String, Value>>,
}

/// A script registered on a node for periodic execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptStorageSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Peer id of the node that stores the script
    pub node: String,

    /// Execution interval in seconds
    #[serde(default = "default_interval", deserialize_with = "whole_seconds")]
    pub interval: u64,
}

fn default_interval() -> u64 {
    DEFAULT_SCRIPT_INTERVAL_SECS
}

/// Accepts any non-negative number of seconds, rounding fractions up
fn whole_seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(de::Error::custom(format!(
            "interval must be a non-negative number of seconds, got {}",
            secs
        )));
    }
    Ok(secs.ceil() as u64)
}

/// Where the bytes of a module or script come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Path, relative to the descriptor's directory unless absolute
    File(PathBuf),
    /// Remote location fetched with a GET request
    Url(String),
}

impl ContentSource {
    /// Picks the source from optional `file`/`url` fields
    ///
    /// A local file wins when both are given.
    pub fn from_fields(file: Option<&str>, url: Option<&str>) -> Option<Self> {
        match (file, url) {
            (Some(file), _) => Some(Self::File(PathBuf::from(file))),
            (None, Some(url)) => Some(Self::Url(url.to_string())),
            (None, None) => None,
        }
    }
}

impl std::fmt::Display for ContentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentSource::File(path) => write!(f, "{}", path.display()),
            ContentSource::Url(url) => write!(f, "{}", url),
        }
    }
}

impl ModuleSpec {
    pub fn source(&self) -> Option<ContentSource> {
        ContentSource::from_fields(self.file.as_deref(), self.url.as_deref())
    }
}

impl ScriptSpec {
    pub fn source(&self) -> Option<ContentSource> {
        ContentSource::from_fields(self.file.as_deref(), self.url.as_deref())
    }
}

impl ScriptStorageSpec {
    pub fn source(&self) -> Option<ContentSource> {
        ContentSource::from_fields(self.file.as_deref(), self.url.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied_on_deserialize() {
        let descriptor: DeploymentDescriptor = serde_json::from_str(
            r#"{
                "services": { "db": { "node": "peer-1" } },
                "modules": { "sqlite3": { "file": "sqlite3.wasm" } },
                "scripts": {},
                "script_storage": { "tick": { "file": "tick.air", "node": "peer-1" } }
            }"#,
        )
        .unwrap();

        assert!(descriptor.services.get("db").unwrap().dependencies.is_empty());
        assert_eq!(
            descriptor.script_storage.get("tick").unwrap().interval,
            DEFAULT_SCRIPT_INTERVAL_SECS
        );
        assert_eq!(
            descriptor.modules.get("sqlite3").unwrap().config,
            ModuleConfigSpec::default()
        );
    }

    #[test]
    fn test_unknown_service_field_rejected() {
        let result: Result<ServiceSpec, _> =
            serde_json::from_str(r#"{ "node": "peer-1", "replicas": 2 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_file_source_preferred_over_url() {
        let module = ModuleSpec {
            file: Some("local.wasm".to_string()),
            url: Some("https://example.com/remote.wasm".to_string()),
            config: ModuleConfigSpec::default(),
        };

        assert_eq!(
            module.source(),
            Some(ContentSource::File(PathBuf::from("local.wasm")))
        );
    }
}
