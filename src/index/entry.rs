//! Index entries: typed field values extracted from one document

use serde_json::Value;

use crate::schema::{FieldSchema, FieldType, IndexSchema, JsonPath};

/// A (longitude, latitude) pair in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    /// Creates a point, rejecting out-of-range coordinates
    pub fn new(lon: f64, lat: f64) -> Option<Self> {
        if (-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat) {
            Some(Self { lon, lat })
        } else {
            None
        }
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => {
                let (lon, lat) = s.split_once(',')?;
                Self::new(lon.trim().parse().ok()?, lat.trim().parse().ok()?)
            }
            Value::Array(items) if items.len() == 2 => {
                Self::new(items[0].as_f64()?, items[1].as_f64()?)
            }
            Value::Object(map) => {
                let lon = map.get("lon").or_else(|| map.get("longitude"))?;
                let lat = map.get("lat").or_else(|| map.get("latitude"))?;
                Self::new(lon.as_f64()?, lat.as_f64()?)
            }
            _ => None,
        }
    }
}

/// The typed values one field contributes for one document
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Literal tag values
    Tag(Vec<String>),
    /// Untokenized source strings, one per array element
    Text(Vec<String>),
    /// Numeric values
    Numeric(Vec<f64>),
    /// Coordinate pair
    Geo(GeoPoint),
}

/// A field whose resolved value contradicts its declared type
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub alias: String,
    pub expected: &'static str,
    pub actual: String,
}

/// Per (schema, document) extraction result: one optional value per field,
/// aligned with the schema's field order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexEntry {
    values: Vec<Option<FieldValue>>,
}

impl IndexEntry {
    /// Extracts every field of `schema` from `body`.
    ///
    /// Fields whose path does not resolve are absent. Fields whose value cannot
    /// be coerced are absent and reported as mismatches; the caller decides
    /// whether that rejects the write.
    pub fn extract(schema: &IndexSchema, body: &Value) -> (Self, Vec<Mismatch>) {
        let mut values = Vec::with_capacity(schema.fields().len());
        let mut mismatches = Vec::new();

        for (field, path) in schema.compiled_fields() {
            match coerce(field, path, body) {
                Ok(value) => values.push(value),
                Err(actual) => {
                    mismatches.push(Mismatch {
                        alias: field.alias.clone(),
                        expected: field.field_type.type_name(),
                        actual,
                    });
                    values.push(None);
                }
            }
        }

        (Self { values }, mismatches)
    }

    /// Returns the value of the field at `position`, if present
    pub fn get(&self, position: usize) -> Option<&FieldValue> {
        self.values.get(position).and_then(Option::as_ref)
    }

    /// Iterates over present values with their field positions
    pub fn present(&self) -> impl Iterator<Item = (usize, &FieldValue)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|v| (i, v)))
    }
}

fn describe(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() > 40 {
        format!("{}...", text.chars().take(40).collect::<String>())
    } else {
        text
    }
}

/// Coerces the resolved nodes of one field. `Err` carries a description of
/// the offending value.
fn coerce(field: &FieldSchema, path: &JsonPath, body: &Value) -> Result<Option<FieldValue>, String> {
    let value = match field.field_type {
        FieldType::Geo => {
            return match path.resolve(body).into_iter().find(|v| !v.is_null()) {
                None => Ok(None),
                Some(node) => GeoPoint::from_json(node)
                    .map(|p| Some(FieldValue::Geo(p)))
                    .ok_or_else(|| describe(node)),
            };
        }
        FieldType::Tag => FieldValue::Tag(collect(path, body, |node| match node {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })?),
        FieldType::Text => FieldValue::Text(collect(path, body, |node| match node {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })?),
        FieldType::Numeric => FieldValue::Numeric(collect(path, body, |node| {
            let n = match node {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            n.filter(|f| f.is_finite())
        })?),
    };

    let empty = match &value {
        FieldValue::Tag(v) | FieldValue::Text(v) => v.is_empty(),
        FieldValue::Numeric(v) => v.is_empty(),
        FieldValue::Geo(_) => false,
    };
    Ok(if empty { None } else { Some(value) })
}

fn collect<T>(
    path: &JsonPath,
    body: &Value,
    convert: impl Fn(&Value) -> Option<T>,
) -> Result<Vec<T>, String> {
    path.resolve_flat(body)
        .into_iter()
        .map(|node| convert(node).ok_or_else(|| describe(node)))
        .collect()
}
