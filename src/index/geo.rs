//! Coordinate storage for GEO fields
//!
//! Read-only access for distance computation; no geo predicates.

use std::collections::HashMap;

use super::entry::GeoPoint;
use super::field::DocId;

/// Stores one point per document
#[derive(Debug, Default)]
pub struct GeoIndex {
    points: HashMap<DocId, GeoPoint>,
}

impl GeoIndex {
    /// Creates an empty geo index
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or replaces the point of a document
    pub fn insert(&mut self, id: DocId, point: GeoPoint) {
        self.points.insert(id, point);
    }

    /// Forgets the point of a document
    pub fn remove(&mut self, id: DocId) {
        self.points.remove(&id);
    }

    /// Returns the point of a document, if it has one
    pub fn get(&self, id: DocId) -> Option<GeoPoint> {
        self.points.get(&id).copied()
    }

    /// Number of documents with a point
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if no document has a point
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
