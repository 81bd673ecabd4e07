//! Index schema type definitions
//!
//! Supported field types:
//! - TAG: exact-match values, no tokenization
//! - TEXT: case-insensitive tokens
//! - NUMERIC: 64-bit floats, range queries
//! - GEO: (longitude, latitude) pairs

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::{SchemaError, SchemaResult};
use super::path::JsonPath;

/// Supported field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    /// Exact-match membership
    Tag,
    /// Tokenized full text
    Text,
    /// Sorted numeric values
    Numeric,
    /// Coordinate pair
    Geo,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Tag => "TAG",
            FieldType::Text => "TEXT",
            FieldType::Numeric => "NUMERIC",
            FieldType::Geo => "GEO",
        }
    }
}

impl FromStr for FieldType {
    type Err = SchemaError;

    fn from_str(s: &str) -> SchemaResult<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TAG" => Ok(FieldType::Tag),
            "TEXT" => Ok(FieldType::Text),
            "NUMERIC" => Ok(FieldType::Numeric),
            "GEO" => Ok(FieldType::Geo),
            _ => Err(SchemaError::UnknownFieldType(s.to_string())),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Declarative description of one indexed field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// JSONPath into the document body
    pub path: String,
    /// Field data type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Externally visible name
    #[serde(rename = "as")]
    pub alias: String,
    /// Whether the field may be used as a search sort key
    #[serde(default)]
    pub sortable: bool,
}

impl FieldSchema {
    /// Create a field definition
    pub fn new(path: impl Into<String>, field_type: FieldType, alias: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            field_type,
            alias: alias.into(),
            sortable: false,
        }
    }

    /// Create a TAG field
    pub fn tag(path: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::new(path, FieldType::Tag, alias)
    }

    /// Create a TEXT field
    pub fn text(path: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::new(path, FieldType::Text, alias)
    }

    /// Create a NUMERIC field
    pub fn numeric(path: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::new(path, FieldType::Numeric, alias)
    }

    /// Create a GEO field
    pub fn geo(path: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::new(path, FieldType::Geo, alias)
    }

    /// Marks the field sortable
    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }
}

/// A named collection of fields bound to a key prefix.
///
/// Paths are compiled once here; an `IndexSchema` value is always valid.
#[derive(Debug, Clone)]
pub struct IndexSchema {
    name: String,
    prefix: String,
    fields: Vec<FieldSchema>,
    paths: Vec<JsonPath>,
}

impl IndexSchema {
    /// Validates and compiles an index definition.
    ///
    /// Fails if the name or an alias is empty, two fields share an alias,
    /// or a path does not parse.
    pub fn new(
        name: impl Into<String>,
        prefix: impl Into<String>,
        fields: Vec<FieldSchema>,
    ) -> SchemaResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SchemaError::InvalidDefinition("index name is empty".into()));
        }

        let mut seen = HashSet::new();
        let mut paths = Vec::with_capacity(fields.len());

        for field in &fields {
            if field.alias.is_empty() {
                return Err(SchemaError::InvalidDefinition(format!(
                    "field '{}' has an empty alias",
                    field.path
                )));
            }
            if !seen.insert(field.alias.as_str()) {
                return Err(SchemaError::DuplicateAlias {
                    index: name.clone(),
                    alias: field.alias.clone(),
                });
            }
            paths.push(JsonPath::parse(&field.path)?);
        }

        Ok(Self {
            name,
            prefix: prefix.into(),
            fields,
            paths,
        })
    }

    /// Returns the index name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the key prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the field definitions in declaration order
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// Returns true if a document key is routed to this index
    pub fn matches_key(&self, key: &str) -> bool {
        key.starts_with(&self.prefix)
    }

    /// Looks up a field by alias, returning its position and definition
    pub fn field(&self, alias: &str) -> Option<(usize, &FieldSchema)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.alias == alias)
    }

    /// Returns the compiled path of the field at `position`
    pub fn path(&self, position: usize) -> &JsonPath {
        &self.paths[position]
    }

    /// Iterates over (definition, compiled path) pairs
    pub fn compiled_fields(&self) -> impl Iterator<Item = (&FieldSchema, &JsonPath)> {
        self.fields.iter().zip(self.paths.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location_fields() -> Vec<FieldSchema> {
        vec![
            FieldSchema::tag("$.status", "status"),
            FieldSchema::text("$.name", "name"),
            FieldSchema::tag("$.address.state", "state"),
            FieldSchema::numeric("$.position.longitude", "longitude"),
        ]
    }

    #[test]
    fn test_schema_valid() {
        let schema = IndexSchema::new("location_idx", "Location:", location_fields()).unwrap();
        assert_eq!(schema.name(), "location_idx");
        assert_eq!(schema.fields().len(), 4);
        assert_eq!(schema.field("state").unwrap().0, 2);
        assert!(schema.field("city").is_none());
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let mut fields = location_fields();
        fields.push(FieldSchema::tag("$.address.city", "state"));

        let err = IndexSchema::new("location_idx", "Location:", fields).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateAlias { ref alias, .. } if alias == "state"));
    }

    #[test]
    fn test_bad_path_rejected() {
        let fields = vec![FieldSchema::tag("status", "status")];
        let err = IndexSchema::new("idx", "X:", fields).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPath { .. }));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(IndexSchema::new(" ", "X:", vec![]).is_err());
        assert!(IndexSchema::new("idx", "X:", vec![FieldSchema::tag("$.a", "")]).is_err());
    }

    #[test]
    fn test_prefix_matching() {
        let schema = IndexSchema::new("claims_idx", "Claim:", vec![]).unwrap();
        assert!(schema.matches_key("Claim:123"));
        assert!(!schema.matches_key("ClaimResponse-123"));
        assert!(!schema.matches_key("Location:1"));
    }

    #[test]
    fn test_field_type_parse() {
        assert_eq!("tag".parse::<FieldType>().unwrap(), FieldType::Tag);
        assert_eq!("NUMERIC".parse::<FieldType>().unwrap(), FieldType::Numeric);
        assert!(matches!(
            "VECTOR".parse::<FieldType>(),
            Err(SchemaError::UnknownFieldType(_))
        ));
    }

    #[test]
    fn test_field_schema_serde() {
        let field: FieldSchema = serde_json::from_value(serde_json::json!({
            "path": "$.requester.display",
            "type": "TEXT",
            "as": "prescriber",
            "sortable": true
        }))
        .unwrap();
        assert_eq!(field, FieldSchema::text("$.requester.display", "prescriber").sortable());
    }
}
