//! Module DTOs
//!
//! Bodies exchanged with a node when uploading and listing modules.

use serde::{Deserialize, Serialize};

use crate::domain::module::ModuleConfig;

/// Request to upload a module to a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadModule {
    pub name: String,

    /// Module bytes, base64 encoded
    pub base64: String,

    pub config: ModuleConfig,

    /// Time the node may spend on the request
    pub ttl_ms: u64,
}

/// Response to a successful module upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleUploaded {
    /// Content hash the node computed for the uploaded bytes
    pub hash: String,
}
