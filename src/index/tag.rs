//! Exact-match tag index

use std::collections::BTreeMap;

use super::field::{DocId, DocSet};

/// Maps each literal tag value to the documents carrying it
#[derive(Debug, Default)]
pub struct TagIndex {
    tags: BTreeMap<String, DocSet>,
}

impl TagIndex {
    /// Creates an empty tag index
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document under every value
    pub fn insert(&mut self, id: DocId, values: &[String]) {
        for value in values {
            self.tags.entry(value.clone()).or_default().insert(id);
        }
    }

    /// Removes a document from every value, dropping emptied tags
    pub fn remove(&mut self, id: DocId, values: &[String]) {
        for value in values {
            if let Some(ids) = self.tags.get_mut(value) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.tags.remove(value);
                }
            }
        }
    }

    /// Documents carrying any of `values` (OR across the set)
    pub fn lookup_any<S: AsRef<str>>(&self, values: &[S]) -> DocSet {
        let mut result = DocSet::new();
        for value in values {
            if let Some(ids) = self.tags.get(value.as_ref()) {
                result.extend(ids.iter().copied());
            }
        }
        result
    }

    /// Returns the number of distinct tag values
    pub fn distinct_count(&self) -> usize {
        self.tags.len()
    }
}
