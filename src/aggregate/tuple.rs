//! Aggregation tuples
//!
//! A tuple is an ordered set of bound fields. Before the first GROUPBY it
//! also remembers the document it was seeded from.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::expr::{Bindings, Scalar};
use crate::index::DocId;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tuple {
    source: Option<DocId>,
    fields: Vec<(String, Scalar)>,
}

impl Tuple {
    /// Empty tuple seeded from a document
    pub fn seeded(source: DocId) -> Self {
        Self {
            source: Some(source),
            fields: Vec::new(),
        }
    }

    /// Tuple with no source document
    pub fn from_fields(fields: Vec<(String, Scalar)>) -> Self {
        Self {
            source: None,
            fields,
        }
    }

    pub fn source(&self) -> Option<DocId> {
        self.source
    }

    /// Returns a bound value; `None` means unbound, not null
    pub fn get(&self, alias: &str) -> Option<&Scalar> {
        self.fields.iter().find(|(name, _)| name == alias).map(|(_, v)| v)
    }

    /// Binds a field, overwriting in place if already bound
    pub fn set(&mut self, alias: &str, value: Scalar) {
        match self.fields.iter_mut().find(|(name, _)| name == alias) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((alias.to_string(), value)),
        }
    }

    pub fn fields(&self) -> &[(String, Scalar)] {
        &self.fields
    }

    /// JSON object of the bound fields
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        Value::Object(map)
    }
}

impl Bindings for Tuple {
    fn lookup(&self, alias: &str) -> Option<&Scalar> {
        self.get(alias)
    }
}

/// Serializes as an object in binding order
impl Serialize for Tuple {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, &value.to_json())?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_overwrites_in_place() {
        let mut tuple = Tuple::seeded(3);
        tuple.set("a", Scalar::Number(1.0));
        tuple.set("b", Scalar::from("x"));
        tuple.set("a", Scalar::Number(2.0));

        assert_eq!(tuple.fields().len(), 2);
        assert_eq!(tuple.get("a"), Some(&Scalar::Number(2.0)));
        assert_eq!(tuple.get("c"), None);
        assert_eq!(tuple.source(), Some(3));
    }

    #[test]
    fn test_serialize_in_binding_order() {
        let tuple = Tuple::from_fields(vec![
            ("year".into(), Scalar::from("2020")),
            ("num".into(), Scalar::Number(3.0)),
        ]);
        assert_eq!(serde_json::to_string(&tuple).unwrap(), r#"{"year":"2020","num":3}"#);
        assert_eq!(tuple.to_json(), json!({"year": "2020", "num": 3}));
    }
}
