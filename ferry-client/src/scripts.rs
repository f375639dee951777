//! Script-related API endpoints

use ferry_core::dto::script::{
    AddScript, CallbackDelivery, ScriptAdded, ScriptSent, SendScript,
};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

use crate::NodeClient;
use crate::error::Result;

impl NodeClient {
    // =============================================================================
    // One-shot Scripts
    // =============================================================================

    /// Submit a script for a single execution
    ///
    /// # Returns
    /// The particle id the node assigned to the execution
    pub async fn send_script(&self, request: &SendScript) -> Result<String> {
        debug!(
            "Sending script (correlation {}) with {} variables, callback {}",
            request.correlation_id,
            request.data.len(),
            request.callback
        );

        let response = self
            .identified(self.client.post(self.url("/api/particles")))
            .timeout(Duration::from_millis(request.ttl_ms))
            .json(request)
            .send()
            .await?;

        let sent: ScriptSent = self.handle_response(response).await?;
        Ok(sent.particle_id)
    }

    /// Ask the node whether a script has called back yet
    ///
    /// # Returns
    /// `Some` with the callback arguments once they arrived, `None` while the
    /// callback is still pending (the node answers 204)
    pub async fn poll_callback(
        &self,
        correlation_id: &str,
        ttl: Duration,
    ) -> Result<Option<CallbackDelivery>> {
        let url = self.url(&format!("/api/callbacks/{}", correlation_id));
        let response = self
            .identified(self.client.get(url))
            .timeout(ttl)
            .send()
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        self.handle_response(response).await.map(Some)
    }

    // =============================================================================
    // Persistent Scripts
    // =============================================================================

    /// Store a script the node re-runs every `interval_sec` seconds
    ///
    /// # Returns
    /// The stored script's id
    pub async fn add_script(
        &self,
        script: &str,
        interval_sec: u64,
        ttl: Duration,
    ) -> Result<String> {
        let response = self
            .identified(self.client.post(self.url("/api/scripts")))
            .timeout(ttl)
            .json(&AddScript {
                script: script.to_string(),
                interval_sec,
            })
            .send()
            .await?;

        let added: ScriptAdded = self.handle_response(response).await?;
        Ok(added.id)
    }
}
