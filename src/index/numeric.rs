//! Sorted numeric index
//!
//! Uses BTreeMap<NumericKey, DocSet> so range retrieval is O(log n + k).
//! Keys are f64 bit patterns remapped to a total order.

use std::collections::BTreeMap;
use std::ops::Bound;

use super::field::{DocId, DocSet};

/// Order-preserving encoding of a finite f64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NumericKey(u64);

impl NumericKey {
    /// Create a key from a float.
    ///
    /// `-0.0` and `0.0` map to the same key.
    pub fn from_float(v: f64) -> Self {
        let v = if v == 0.0 { 0.0 } else { v };
        let bits = v.to_bits();
        let ordered = if (bits >> 63) == 1 {
            !bits // Negative: flip all bits
        } else {
            bits ^ (1 << 63) // Positive: flip sign bit
        };
        NumericKey(ordered)
    }
}

/// A range bound on a numeric field. Infinite values mean unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericBound {
    pub value: f64,
    pub inclusive: bool,
}

impl NumericBound {
    pub fn inclusive(value: f64) -> Self {
        Self {
            value,
            inclusive: true,
        }
    }

    pub fn exclusive(value: f64) -> Self {
        Self {
            value,
            inclusive: false,
        }
    }

    fn to_bound(self) -> Bound<NumericKey> {
        if self.value.is_infinite() {
            Bound::Unbounded
        } else if self.inclusive {
            Bound::Included(NumericKey::from_float(self.value))
        } else {
            Bound::Excluded(NumericKey::from_float(self.value))
        }
    }
}

/// A single numeric field index
#[derive(Debug, Default)]
pub struct NumericIndex {
    tree: BTreeMap<NumericKey, DocSet>,
}

impl NumericIndex {
    /// Creates a new empty numeric index
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document under every value
    pub fn insert(&mut self, id: DocId, values: &[f64]) {
        for &v in values {
            self.tree.entry(NumericKey::from_float(v)).or_default().insert(id);
        }
    }

    /// Removes a document from every value, dropping emptied keys
    pub fn remove(&mut self, id: DocId, values: &[f64]) {
        for &v in values {
            let key = NumericKey::from_float(v);
            if let Some(ids) = self.tree.get_mut(&key) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.tree.remove(&key);
                }
            }
        }
    }

    /// Documents with at least one value inside `[min, max]`.
    ///
    /// An empty or inverted range yields no documents.
    pub fn lookup_range(&self, min: NumericBound, max: NumericBound) -> DocSet {
        if min.value.is_nan() || max.value.is_nan() || min.value == f64::INFINITY || max.value == f64::NEG_INFINITY {
            return DocSet::new();
        }

        let lower = min.to_bound();
        let upper = max.to_bound();

        // BTreeMap::range panics on inverted or empty-exclusive ranges
        if let (Bound::Included(lo) | Bound::Excluded(lo), Bound::Included(hi) | Bound::Excluded(hi)) =
            (lower, upper)
        {
            let both_inclusive = matches!((lower, upper), (Bound::Included(_), Bound::Included(_)));
            if lo > hi || (lo == hi && !both_inclusive) {
                return DocSet::new();
            }
        }

        let mut result = DocSet::new();
        for (_, ids) in self.tree.range((lower, upper)) {
            result.extend(ids.iter().copied());
        }
        result
    }

    /// Returns the number of distinct values
    pub fn key_count(&self) -> usize {
        self.tree.len()
    }
}
