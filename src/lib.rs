//! fhirsearch - a schema-driven JSON document index for FHIR resources
//!
//! Documents are stored under `<Type>:<Id>` keys. Index schemas select
//! documents by key prefix and extract TAG, TEXT, NUMERIC and GEO fields
//! through JSONPaths. Indexes answer boolean queries and feed aggregation
//! pipelines (LOAD, APPLY, GROUPBY, FILTER, SORTBY, LIMIT).
//!
//! ```ignore
//! use fhirsearch::{SearchEngine, EngineConfig, schema::FieldSchema, query::SearchOptions};
//!
//! let engine = SearchEngine::new(EngineConfig::default());
//! engine.create_index("loc_idx", "Location:", vec![FieldSchema::tag("$.status", "status")])?;
//! engine.put("Location:1", serde_json::json!({"status": "active"}))?;
//! let found = engine.search("loc_idx", "@status:{active}", &SearchOptions::new())?;
//! ```

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod expr;
pub mod index;
pub mod observability;
pub mod query;
pub mod schema;

pub use config::EngineConfig;
pub use engine::SearchEngine;
pub use error::{Error, Result};
