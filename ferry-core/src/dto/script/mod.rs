//! Script DTOs
//!
//! One-shot scripts are sent as particles and report back through a callback
//! identified by a service/function pair. Persistent scripts are stored on the
//! node and re-run on an interval.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Service and function a script calls to report its result
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackTarget {
    pub service: String,
    pub function: String,
}

impl CallbackTarget {
    pub fn new(service: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            function: function.into(),
        }
    }
}

impl std::fmt::Display for CallbackTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.service, self.function)
    }
}

/// Request to execute a script once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendScript {
    /// Client-chosen id the node files the callback under
    pub correlation_id: String,

    pub script: String,

    /// Variables made available to the script
    pub data: Map<String, Value>,

    pub callback: CallbackTarget,

    pub ttl_ms: u64,
}

/// Response to a submitted script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptSent {
    pub particle_id: String,
}

/// Arguments a script passed to its callback
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallbackDelivery {
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Request to store a script for periodic execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddScript {
    pub script: String,
    pub interval_sec: u64,
}

/// Response carrying the stored script's id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptAdded {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_delivery_defaults_to_no_args() {
        let delivery: CallbackDelivery = serde_json::from_str("{}").unwrap();
        assert!(delivery.args.is_empty());
    }

    #[test]
    fn test_send_script_wire_shape() {
        let request = SendScript {
            correlation_id: "c-1".to_string(),
            script: "(null)".to_string(),
            data: Map::new(),
            callback: CallbackTarget::new("callbackSrv", "response"),
            ttl_ms: 1000,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["callback"]["service"], "callbackSrv");
        assert_eq!(json["correlation_id"], "c-1");
    }
}
