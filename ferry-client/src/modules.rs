//! Module-related API endpoints

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ferry_core::domain::module::ModuleArtifact;
use ferry_core::dto::module::{ModuleUploaded, UploadModule};
use ferry_core::dto::ttl_millis;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::NodeClient;
use crate::error::Result;

impl NodeClient {
    // =============================================================================
    // Module Upload & Listing
    // =============================================================================

    /// Upload a module to the node
    ///
    /// # Arguments
    /// * `module` - Module configuration and bytes
    /// * `ttl` - Time the node may spend on the request
    ///
    /// # Returns
    /// The content hash the node computed for the module
    pub async fn upload_module(&self, module: &ModuleArtifact, ttl: Duration) -> Result<String> {
        debug!(
            "Uploading module '{}' ({} bytes) to {}",
            module.name(),
            module.bytes.len(),
            self.base_url
        );

        let request = UploadModule {
            name: module.name().to_string(),
            base64: STANDARD.encode(&module.bytes),
            config: module.config.clone(),
            ttl_ms: ttl_millis(ttl),
        };

        let response = self
            .identified(self.client.post(self.url("/api/modules")))
            .timeout(ttl)
            .json(&request)
            .send()
            .await?;

        let uploaded: ModuleUploaded = self.handle_response(response).await?;
        Ok(uploaded.hash)
    }

    /// List the modules stored on the node
    pub async fn get_modules(&self, ttl: Duration) -> Result<Value> {
        let response = self
            .identified(self.client.get(self.url("/api/modules")))
            .timeout(ttl)
            .send()
            .await?;

        self.handle_response(response).await
    }
}
