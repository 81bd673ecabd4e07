//! Search options and result types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ast::SortDirection;

/// Sort request for a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortBy {
    /// Alias of a sortable field
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Options of a search call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// JSONPaths (`$.a.b`) or aliases to project; `None` returns the body
    pub return_fields: Option<Vec<String>>,
    /// Matches to skip
    pub offset: usize,
    /// Page size; `None` returns every remaining match
    pub limit: Option<usize>,
    /// Order of matches before paging; insertion order otherwise
    pub sort_by: Option<SortBy>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn return_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.return_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_by = Some(SortBy {
            field: field.into(),
            direction,
        });
        self
    }
}

/// One matched document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchDocument {
    pub key: String,
    /// Projected values keyed by the requested field, or the whole body
    /// under `"$"`
    pub fields: Map<String, Value>,
}

/// Result of a search call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResult {
    /// Matches before paging
    pub total_matched: usize,
    pub documents: Vec<SearchDocument>,
}

impl SearchResult {
    /// Keys of the returned documents, in order
    pub fn keys(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.key.as_str()).collect()
    }
}
