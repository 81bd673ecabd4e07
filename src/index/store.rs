//! Keyed JSON document table
//!
//! The store is the source of truth; indexes are derived from it.

use std::collections::HashMap;

use serde_json::Value;

/// In-memory document table keyed by `"<Type>:<Id>"`
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: HashMap<String, Value>,
}

impl DocumentStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a document, returning the body it replaced (last write wins)
    pub fn put(&mut self, key: impl Into<String>, body: Value) -> Option<Value> {
        self.documents.insert(key.into(), body)
    }

    /// Reads a document body
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.documents.get(key)
    }

    /// Returns all keys starting with `prefix`, sorted
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .documents
            .keys()
            .filter(|k| k.starts_with(prefix))
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
