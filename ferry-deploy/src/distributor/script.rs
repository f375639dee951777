//! Script execution on nodes
//!
//! One-shot scripts report back through a callback. The callback is
//! registered under a fresh correlation id before the script is sent, and the
//! returned [`ScriptHandle`] resolves once the script calls it.

use ferry_core::domain::node::Node;
use ferry_core::dto::script::{CallbackDelivery, CallbackTarget, SendScript};
use ferry_core::dto::ttl_millis;
use serde_json::{Map, Value};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::info;
use uuid::Uuid;

use super::Distributor;
use crate::error::{DeployError, Result};

/// Variable conventions of the script language a deployment is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptDialect {
    /// Hand-written scripts: `relay` and `returnService` are injected and
    /// the result is expected on `(<returnService>, "run")`
    #[default]
    Air,
    /// Compiler-generated scripts: `-relay-` is injected and the result is
    /// expected on `("callbackSrv", "response")`
    Aqua,
}

impl ScriptDialect {
    /// Adds the variables every script of this dialect relies on
    ///
    /// They are inserted last and overwrite user-supplied values.
    pub fn inject(&self, data: &mut Map<String, Value>, relay: &str, correlation_id: &str) {
        match self {
            ScriptDialect::Air => {
                data.insert("relay".into(), Value::String(relay.to_string()));
                data.insert(
                    "returnService".into(),
                    Value::String(correlation_id.to_string()),
                );
            }
            ScriptDialect::Aqua => {
                data.insert("-relay-".into(), Value::String(relay.to_string()));
            }
        }
    }

    /// Where scripts of this dialect deliver their result
    pub fn callback(&self, correlation_id: &str) -> CallbackTarget {
        match self {
            ScriptDialect::Air => CallbackTarget::new(correlation_id, "run"),
            ScriptDialect::Aqua => CallbackTarget::new("callbackSrv", "response"),
        }
    }
}

impl FromStr for ScriptDialect {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "air" => Ok(ScriptDialect::Air),
            "aqua" => Ok(ScriptDialect::Aqua),
            other => Err(DeployError::Config(format!(
                "unknown script dialect '{}' (expected air or aqua)",
                other
            ))),
        }
    }
}

/// A script that was sent and whose callback has not been awaited yet
#[derive(Debug)]
pub struct ScriptHandle {
    pub name: String,
    pub particle_id: String,
    pub correlation_id: String,
    receiver: oneshot::Receiver<CallbackDelivery>,
}

impl ScriptHandle {
    /// Waits for the script to call back
    ///
    /// Without a timeout this waits as long as the callback stays registered,
    /// which is forever for a script that never answers.
    pub async fn wait(self, timeout: Option<Duration>) -> Result<CallbackDelivery> {
        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.receiver).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(DeployError::ScriptTimeout {
                        script: self.name,
                        seconds: limit.as_secs(),
                    });
                }
            },
            None => self.receiver.await,
        };

        outcome.map_err(|_| DeployError::CallbackDropped(self.name))
    }
}

impl Distributor {
    // =============================================================================
    // Scripts
    // =============================================================================

    /// Sends a script to `node` for one execution
    ///
    /// # Arguments
    /// * `node` - Node that runs the script, also injected as the relay
    /// * `name` - Label used in logs and errors
    /// * `script` - Script text
    /// * `data` - Variables made available to the script
    /// * `dialect` - Decides the injected variables and the callback target
    pub async fn run_script(
        &self,
        node: &Node,
        name: &str,
        script: &str,
        mut data: Map<String, Value>,
        dialect: ScriptDialect,
    ) -> Result<ScriptHandle> {
        let conn = self.connection(node).await?;
        let correlation_id = Uuid::new_v4().to_string();

        dialect.inject(&mut data, &node.peer_id, &correlation_id);
        let callback = dialect.callback(&correlation_id);
        let receiver = conn.subscribe(&correlation_id);

        let request = SendScript {
            correlation_id: correlation_id.clone(),
            script: script.to_string(),
            data,
            callback,
            ttl_ms: ttl_millis(self.config().ttl),
        };

        match conn.send_script(request).await {
            Ok(particle_id) => {
                info!(
                    "Script '{}' sent to {} as particle {}, waiting for its callback",
                    name, node, particle_id
                );
                Ok(ScriptHandle {
                    name: name.to_string(),
                    particle_id,
                    correlation_id,
                    receiver,
                })
            }
            Err(e) => {
                conn.cancel_callback(&correlation_id);
                Err(DeployError::remote("send_script", &node.peer_id, e))
            }
        }
    }

    /// Stores a script on `node` to run every `interval_sec` seconds
    ///
    /// # Returns
    /// The id the node registered the script under
    pub async fn register_persistent_script(
        &self,
        node: &Node,
        script: &str,
        interval_sec: u64,
    ) -> Result<String> {
        let conn = self.connection(node).await?;
        let id = conn
            .add_script(script, interval_sec, self.config().ttl)
            .await
            .map_err(|e| DeployError::remote("add_script", &node.peer_id, e))?;

        info!(
            "Script {} registered on {} to run every {}s",
            id, node, interval_sec
        );
        Ok(id)
    }
}
