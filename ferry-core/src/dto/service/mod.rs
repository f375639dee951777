//! Service DTOs

use serde::{Deserialize, Serialize};

/// Request to instantiate a service from a blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateService {
    pub blueprint_id: String,
    pub ttl_ms: u64,
}

/// Response carrying the new service instance id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCreated {
    pub id: String,
}
