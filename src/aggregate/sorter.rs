//! Tuple sorting for SORTBY
//!
//! Multi-key, stable, deterministic. Null keys sort last in either
//! direction.

use std::cmp::Ordering;

use crate::expr::Scalar;
use crate::query::SortDirection;

use super::tuple::Tuple;

/// Sorts tuples on precomputed keys
pub struct TupleSorter;

impl TupleSorter {
    /// Sorts `(keys, tuple)` pairs, where `keys[i]` is ordered by
    /// `directions[i]`. Ties keep their input order.
    pub fn sort(rows: &mut [(Vec<Scalar>, Tuple)], directions: &[SortDirection]) {
        rows.sort_by(|(a, _), (b, _)| Self::compare_keys(a, b, directions));
    }

    fn compare_keys(a: &[Scalar], b: &[Scalar], directions: &[SortDirection]) -> Ordering {
        for ((x, y), direction) in a.iter().zip(b).zip(directions) {
            let ordering = x.sort_cmp(y, direction.is_descending());
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}
