//! Blueprint DTOs

use serde::{Deserialize, Serialize};

use crate::domain::blueprint::Blueprint;

/// Request to register a blueprint on a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddBlueprint {
    pub name: String,
    pub dependencies: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub ttl_ms: u64,
}

impl AddBlueprint {
    pub fn new(blueprint: &Blueprint, ttl_ms: u64) -> Self {
        Self {
            name: blueprint.name.clone(),
            dependencies: blueprint.dependencies.clone(),
            id: blueprint.id.clone(),
            ttl_ms,
        }
    }
}

/// Response carrying the identifier the node assigned to a blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintCreated {
    pub id: String,
}
