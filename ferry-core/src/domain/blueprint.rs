//! Blueprint domain types

use serde::{Deserialize, Serialize};

/// A named, ordered composition of modules a service is created from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blueprint {
    pub name: String,

    /// Module references, either plain module names or `hash:<hash>`
    pub dependencies: Vec<String>,

    /// Identifier requested by the caller; the node may assign another one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Blueprint {
    pub fn new(name: impl Into<String>, dependencies: Vec<String>) -> Self {
        Self {
            name: name.into(),
            dependencies,
            id: None,
        }
    }

    /// Pins the blueprint to a caller-chosen identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Formats a module content hash as a blueprint dependency reference
pub fn hash_reference(hash: &str) -> String {
    format!("hash:{}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_reference() {
        assert_eq!(hash_reference("abc123"), "hash:abc123");
    }

    #[test]
    fn test_pinned_id_serialized_only_when_set() {
        let plain = serde_json::to_value(Blueprint::new("db", vec!["hash:a".into()])).unwrap();
        assert!(plain.get("id").is_none());

        let pinned =
            serde_json::to_value(Blueprint::new("db", vec![]).with_id("bp-1")).unwrap();
        assert_eq!(pinned["id"], "bp-1");
    }
}
