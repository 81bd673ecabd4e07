//! GROUPBY reducers

use std::collections::HashSet;

use crate::expr::Scalar;

use super::stage::ReducerKind;

/// Hashable form of a scalar, used for group keys and distinct counts.
/// Equality is exact on the stored representation: `"2020"` and `2020`
/// are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Null,
    Bool(bool),
    Number(u64),
    Text(String),
}

impl From<&Scalar> for KeyPart {
    fn from(value: &Scalar) -> Self {
        match value {
            Scalar::Null => KeyPart::Null,
            Scalar::Bool(b) => KeyPart::Bool(*b),
            // -0.0 and 0.0 group together
            Scalar::Number(n) => KeyPart::Number(if *n == 0.0 { 0 } else { n.to_bits() }),
            Scalar::Text(s) => KeyPart::Text(s.clone()),
        }
    }
}

/// Running state of one reducer within one group
#[derive(Debug, Clone)]
pub enum Accumulator {
    Count(u64),
    CountDistinct(HashSet<KeyPart>),
    Sum(f64),
    Min(Option<f64>),
    Max(Option<f64>),
    Avg { sum: f64, count: u64 },
}

impl Accumulator {
    pub fn new(kind: ReducerKind) -> Self {
        match kind {
            ReducerKind::Count => Accumulator::Count(0),
            ReducerKind::CountDistinct => Accumulator::CountDistinct(HashSet::new()),
            ReducerKind::Sum => Accumulator::Sum(0.0),
            ReducerKind::Min => Accumulator::Min(None),
            ReducerKind::Max => Accumulator::Max(None),
            ReducerKind::Avg => Accumulator::Avg { sum: 0.0, count: 0 },
        }
    }

    /// Folds one tuple's property value. Numeric reducers skip values
    /// that are not numbers.
    pub fn update(&mut self, value: Option<&Scalar>) {
        match self {
            Accumulator::Count(n) => *n += 1,
            Accumulator::CountDistinct(seen) => {
                if let Some(v) = value.filter(|v| !v.is_null()) {
                    seen.insert(KeyPart::from(v));
                }
            }
            Accumulator::Sum(total) => {
                if let Some(n) = value.and_then(Scalar::as_number) {
                    *total += n;
                }
            }
            Accumulator::Min(current) => {
                if let Some(n) = value.and_then(Scalar::as_number) {
                    *current = Some(current.map_or(n, |c| c.min(n)));
                }
            }
            Accumulator::Max(current) => {
                if let Some(n) = value.and_then(Scalar::as_number) {
                    *current = Some(current.map_or(n, |c| c.max(n)));
                }
            }
            Accumulator::Avg { sum, count } => {
                if let Some(n) = value.and_then(Scalar::as_number) {
                    *sum += n;
                    *count += 1;
                }
            }
        }
    }

    /// Final value of the reducer
    pub fn finish(&self) -> Scalar {
        match self {
            Accumulator::Count(n) => Scalar::Number(*n as f64),
            Accumulator::CountDistinct(seen) => Scalar::Number(seen.len() as f64),
            Accumulator::Sum(total) => Scalar::Number(*total),
            Accumulator::Min(v) | Accumulator::Max(v) => v.map_or(Scalar::Null, Scalar::Number),
            Accumulator::Avg { count: 0, .. } => Scalar::Null,
            Accumulator::Avg { sum, count } => Scalar::Number(sum / *count as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold(kind: ReducerKind, values: &[Scalar]) -> Scalar {
        let mut acc = Accumulator::new(kind);
        for v in values {
            acc.update(Some(v));
        }
        acc.finish()
    }

    #[test]
    fn test_numeric_reducers() {
        let values = [
            Scalar::Number(1500.0),
            Scalar::from("250.5"),
            Scalar::Null,
            Scalar::from("n/a"),
            Scalar::Number(-10.0),
        ];
        assert_eq!(fold(ReducerKind::Count, &values), Scalar::Number(5.0));
        assert_eq!(fold(ReducerKind::Sum, &values), Scalar::Number(1740.5));
        assert_eq!(fold(ReducerKind::Min, &values), Scalar::Number(-10.0));
        assert_eq!(fold(ReducerKind::Max, &values), Scalar::Number(1500.0));
        assert_eq!(fold(ReducerKind::Avg, &values), Scalar::Number(1740.5 / 3.0));
    }

    #[test]
    fn test_empty_reducers() {
        assert_eq!(fold(ReducerKind::Sum, &[]), Scalar::Number(0.0));
        assert_eq!(fold(ReducerKind::Min, &[]), Scalar::Null);
        assert_eq!(fold(ReducerKind::Avg, &[Scalar::Null]), Scalar::Null);
    }

    #[test]
    fn test_count_distinct_is_exact() {
        let values = [
            Scalar::from("2020"),
            Scalar::Number(2020.0),
            Scalar::from("2020"),
            Scalar::Null,
        ];
        assert_eq!(fold(ReducerKind::CountDistinct, &values), Scalar::Number(2.0));
    }

    #[test]
    fn test_count_ignores_property() {
        let mut acc = Accumulator::new(ReducerKind::Count);
        acc.update(None);
        acc.update(None);
        assert_eq!(acc.finish(), Scalar::Number(2.0));
    }
}
