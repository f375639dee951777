//! Session upload cache
//!
//! Remembers what was already uploaded to which node during one run, so that
//! a module shared by several services is sent to a node only once. The cache
//! lives in memory and is never persisted.

use std::collections::HashMap;

/// Identifies an upload: the node it went to and the name it was stored under
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UploadKey {
    pub node: String,
    pub name: String,
}

impl UploadKey {
    pub fn new(node: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            name: name.into(),
        }
    }
}

/// What a node returned for each completed upload (a hash or an id)
///
/// Keyed by name, not by content: a second artifact declared under an already
/// uploaded name reuses the first upload's result.
#[derive(Debug, Clone, Default)]
pub struct UploadCache {
    entries: HashMap<UploadKey, String>,
}

impl UploadCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: &str, name: &str) -> Option<&str> {
        self.entries
            .get(&UploadKey::new(node, name))
            .map(String::as_str)
    }

    /// Records a completed upload, replacing any earlier result
    pub fn record(&mut self, node: &str, name: &str, result: impl Into<String>) {
        self.entries
            .insert(UploadKey::new(node, name), result.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_per_node() {
        let mut cache = UploadCache::new();
        cache.record("node-1", "sqlite3", "hash-a");

        assert_eq!(cache.get("node-1", "sqlite3"), Some("hash-a"));
        assert_eq!(cache.get("node-2", "sqlite3"), None);
        assert_eq!(cache.get("node-1", "history"), None);
    }

    #[test]
    fn test_same_key_is_one_entry() {
        let mut cache = UploadCache::new();
        cache.record("node-1", "sqlite3", "hash-a");
        cache.record("node-1", "sqlite3", "hash-b");

        assert_eq!(cache.get("node-1", "sqlite3"), Some("hash-b"));
        assert_eq!(cache.entries.len(), 1);
    }
}
