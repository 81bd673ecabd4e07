//! Per-field index variants
//!
//! Each schema field owns exactly one structure, chosen from its declared
//! type when the index is created.

use std::collections::BTreeSet;

use crate::schema::FieldType;

use super::entry::FieldValue;
use super::geo::GeoIndex;
use super::numeric::NumericIndex;
use super::tag::TagIndex;
use super::text::TextIndex;

/// Dense per-index document handle, assigned on first write of a key
pub type DocId = u64;

/// Ordered set of document handles. Iteration order is insertion order of
/// the underlying keys.
pub type DocSet = BTreeSet<DocId>;

/// One concrete index structure per schema field
#[derive(Debug)]
pub enum FieldIndex {
    Tag(TagIndex),
    Text(TextIndex),
    Numeric(NumericIndex),
    Geo(GeoIndex),
}

impl FieldIndex {
    /// Allocates the empty structure for a field type
    pub fn for_type(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Tag => FieldIndex::Tag(TagIndex::new()),
            FieldType::Text => FieldIndex::Text(TextIndex::new()),
            FieldType::Numeric => FieldIndex::Numeric(NumericIndex::new()),
            FieldType::Geo => FieldIndex::Geo(GeoIndex::new()),
        }
    }

    /// Returns the field type this structure serves
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldIndex::Tag(_) => FieldType::Tag,
            FieldIndex::Text(_) => FieldType::Text,
            FieldIndex::Numeric(_) => FieldType::Numeric,
            FieldIndex::Geo(_) => FieldType::Geo,
        }
    }

    /// Adds a document's value. Values of another variant are ignored;
    /// extraction never produces them.
    pub fn insert(&mut self, id: DocId, value: &FieldValue) {
        match (self, value) {
            (FieldIndex::Tag(index), FieldValue::Tag(values)) => index.insert(id, values),
            (FieldIndex::Text(index), FieldValue::Text(values)) => index.insert(id, values),
            (FieldIndex::Numeric(index), FieldValue::Numeric(values)) => index.insert(id, values),
            (FieldIndex::Geo(index), FieldValue::Geo(point)) => index.insert(id, *point),
            _ => {}
        }
    }

    /// Removes a document's previously inserted value
    pub fn remove(&mut self, id: DocId, value: &FieldValue) {
        match (self, value) {
            (FieldIndex::Tag(index), FieldValue::Tag(values)) => index.remove(id, values),
            (FieldIndex::Text(index), FieldValue::Text(values)) => index.remove(id, values),
            (FieldIndex::Numeric(index), FieldValue::Numeric(values)) => index.remove(id, values),
            (FieldIndex::Geo(index), FieldValue::Geo(_)) => index.remove(id),
            _ => {}
        }
    }

    /// Number of distinct keys held: tags, tokens, numbers or points
    pub fn distinct_values(&self) -> usize {
        match self {
            FieldIndex::Tag(index) => index.distinct_count(),
            FieldIndex::Text(index) => index.term_count(),
            FieldIndex::Numeric(index) => index.key_count(),
            FieldIndex::Geo(index) => index.len(),
        }
    }

    pub fn as_tag(&self) -> Option<&TagIndex> {
        match self {
            FieldIndex::Tag(index) => Some(index),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextIndex> {
        match self {
            FieldIndex::Text(index) => Some(index),
            _ => None,
        }
    }

    pub fn as_numeric(&self) -> Option<&NumericIndex> {
        match self {
            FieldIndex::Numeric(index) => Some(index),
            _ => None,
        }
    }

    pub fn as_geo(&self) -> Option<&GeoIndex> {
        match self {
            FieldIndex::Geo(index) => Some(index),
            _ => None,
        }
    }
}
