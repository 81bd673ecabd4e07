//! Scalar values bound in tuples and produced by expressions

use std::cmp::Ordering;
use std::fmt;

use serde_json::{Number, Value};

use crate::index::FieldValue;

/// Largest magnitude emitted as a JSON integer
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A single bound value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "boolean",
            Scalar::Number(_) => "number",
            Scalar::Text(_) => "string",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Numeric view: numbers, and strings that parse as finite numbers
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Converts a JSON node. Arrays and objects become their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(Scalar::Null, Scalar::Number),
            Value::String(s) => Scalar::Text(s.clone()),
            other => Scalar::Text(other.to_string()),
        }
    }

    /// Converts to JSON. Integral numbers are emitted as integers.
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Number(n) => {
                if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
                    Value::from(*n as i64)
                } else {
                    Number::from_f64(*n).map_or(Value::Null, Value::Number)
                }
            }
            Scalar::Text(s) => Value::String(s.clone()),
        }
    }

    /// Total order over non-null values: booleans, then numbers, then strings
    pub fn compare(&self, other: &Scalar) -> Ordering {
        fn rank(s: &Scalar) -> u8 {
            match s {
                Scalar::Null => 0,
                Scalar::Bool(_) => 1,
                Scalar::Number(_) => 2,
                Scalar::Text(_) => 3,
            }
        }

        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a.cmp(b),
            (Scalar::Number(a), Scalar::Number(b)) => a.total_cmp(b),
            (Scalar::Text(a), Scalar::Text(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }

    /// Sort comparison: null sorts last in both directions
    pub fn sort_cmp(&self, other: &Scalar, descending: bool) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) if descending => self.compare(other).reverse(),
            (false, false) => self.compare(other),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                write!(f, "{}", *n as i64)
            }
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

/// First value of an indexed field. GEO points become `"lon,lat"`.
impl From<&FieldValue> for Scalar {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Tag(values) | FieldValue::Text(values) => {
                values.first().map_or(Scalar::Null, |s| Scalar::Text(s.clone()))
            }
            FieldValue::Numeric(values) => values.first().map_or(Scalar::Null, |n| Scalar::Number(*n)),
            FieldValue::Geo(point) => Scalar::Text(format!("{},{}", point.lon, point.lat)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integral_numbers_emit_as_integers() {
        assert_eq!(Scalar::Number(2020.0).to_json(), json!(2020));
        assert_eq!(Scalar::Number(1.5).to_json(), json!(1.5));
        assert_eq!(Scalar::Number(f64::NAN).to_json(), Value::Null);
        assert_eq!(Scalar::Number(3.0).to_string(), "3");
    }

    #[test]
    fn test_null_sorts_last_both_directions() {
        let one = Scalar::Number(1.0);
        assert_eq!(Scalar::Null.sort_cmp(&one, false), Ordering::Greater);
        assert_eq!(Scalar::Null.sort_cmp(&one, true), Ordering::Greater);
        assert_eq!(one.sort_cmp(&Scalar::Number(2.0), true), Ordering::Greater);
    }

    #[test]
    fn test_as_number() {
        assert_eq!(Scalar::from("42").as_number(), Some(42.0));
        assert_eq!(Scalar::from("abc").as_number(), None);
        assert_eq!(Scalar::Bool(true).as_number(), None);
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Scalar::from_json(&json!("x")), Scalar::Text("x".into()));
        assert_eq!(Scalar::from_json(&json!(7)), Scalar::Number(7.0));
        assert_eq!(Scalar::from_json(&json!([1, 2])), Scalar::Text("[1,2]".into()));
    }
}
