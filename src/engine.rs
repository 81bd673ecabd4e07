//! Search engine facade
//!
//! Bundles an [`IndexManager`] with its configuration and exposes the
//! in-process API: index definition, document writes, search and
//! aggregation. Each engine owns its own registry, so independent engines
//! can coexist in one process.

use serde_json::Value;

use crate::aggregate::{self, AggregateOutput, Stage};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::index::{IndexInfo, IndexManager};
use crate::query::{self, SearchOptions, SearchResult};
use crate::schema::FieldSchema;

#[derive(Debug)]
pub struct SearchEngine {
    manager: IndexManager,
    config: EngineConfig,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl SearchEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            manager: IndexManager::with_strict_types(config.strict_types),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Underlying index manager
    pub fn manager(&self) -> &IndexManager {
        &self.manager
    }

    /// Registers an index over keys starting with `prefix`
    pub fn create_index(&self, name: &str, prefix: &str, fields: Vec<FieldSchema>) -> Result<()> {
        Ok(self.manager.create_index(name, prefix, fields)?)
    }

    pub fn drop_index(&self, name: &str) -> Result<()> {
        Ok(self.manager.drop_index(name)?)
    }

    /// Stores a document under `key` (`<Type>:<Id>`)
    pub fn put(&self, key: &str, body: Value) -> Result<()> {
        Ok(self.manager.put(key, body)?)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.manager.get(key)
    }

    /// Runs a search. The page size falls back to `default_limit` and is
    /// clamped to `max_limit`.
    pub fn search(&self, index: &str, query: &str, options: &SearchOptions) -> Result<SearchResult> {
        let mut options = options.clone();
        options.limit = Some(self.config.effective_limit(options.limit));
        Ok(query::search(&self.manager, index, query, &options)?)
    }

    /// Runs an aggregation pipeline over the matches of `query`
    pub fn aggregate(&self, index: &str, query: &str, stages: &[Stage]) -> Result<AggregateOutput> {
        Ok(aggregate::aggregate(&self.manager, index, query, stages)?)
    }

    pub fn list_indexes(&self) -> Vec<String> {
        self.manager.list_indexes()
    }

    pub fn index_info(&self, name: &str) -> Result<IndexInfo> {
        Ok(self.manager.index_info(name)?)
    }
}
