//! JSONPath subset used by field schemas and projections
//!
//! Supported syntax:
//! - `$` root
//! - `.name` / `['name']` member access
//! - `[n]` array element
//! - `[*]` / `.*` every element (arrays) or every member value (objects)

use std::fmt;

use serde_json::Value;

use super::errors::{SchemaError, SchemaResult};

/// One step of a compiled path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Object member
    Key(String),
    /// Array element
    Index(usize),
    /// All children
    Wildcard,
}

/// A compiled JSONPath expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    raw: String,
    segments: Vec<Segment>,
}

impl JsonPath {
    /// Parses a path such as `$.address.state` or `$.specialty[*].text`.
    pub fn parse(raw: &str) -> SchemaResult<Self> {
        let mut chars = raw.char_indices().peekable();

        match chars.next() {
            Some((_, '$')) => {}
            _ => return Err(SchemaError::invalid_path(raw, "path must start with '$'")),
        }

        let mut segments = Vec::new();

        while let Some((pos, c)) = chars.next() {
            match c {
                '.' => {
                    let mut name = String::new();
                    while let Some(&(_, nc)) = chars.peek() {
                        if nc == '.' || nc == '[' {
                            break;
                        }
                        name.push(nc);
                        chars.next();
                    }
                    match name.as_str() {
                        "" => {
                            return Err(SchemaError::invalid_path(
                                raw,
                                format!("empty member name at offset {}", pos),
                            ))
                        }
                        "*" => segments.push(Segment::Wildcard),
                        _ => segments.push(Segment::Key(name)),
                    }
                }
                '[' => {
                    let mut inner = String::new();
                    let mut closed = false;
                    let mut quote: Option<char> = None;
                    for (_, nc) in chars.by_ref() {
                        match quote {
                            Some(q) if nc == q => quote = None,
                            Some(_) => {}
                            None if nc == '\'' || nc == '"' => quote = Some(nc),
                            None if nc == ']' => {
                                closed = true;
                                break;
                            }
                            None => {}
                        }
                        inner.push(nc);
                    }
                    if !closed {
                        return Err(SchemaError::invalid_path(raw, "unterminated '['"));
                    }
                    segments.push(Self::parse_bracket(raw, inner.trim())?);
                }
                other => {
                    return Err(SchemaError::invalid_path(
                        raw,
                        format!("unexpected '{}' at offset {}", other, pos),
                    ))
                }
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    fn parse_bracket(raw: &str, inner: &str) -> SchemaResult<Segment> {
        if inner == "*" {
            return Ok(Segment::Wildcard);
        }

        for q in ['\'', '"'] {
            if inner.len() >= 2 && inner.starts_with(q) && inner.ends_with(q) {
                return Ok(Segment::Key(inner[1..inner.len() - 1].to_string()));
            }
        }

        inner
            .parse::<usize>()
            .map(Segment::Index)
            .map_err(|_| SchemaError::invalid_path(raw, format!("bad subscript '[{}]'", inner)))
    }

    /// Returns the source text of the path
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the compiled segments
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Resolves the path against a document.
    ///
    /// Returns every matched node in document order. A missing member
    /// yields no match rather than an error.
    pub fn resolve<'a>(&self, document: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![document];

        for segment in &self.segments {
            let mut next = Vec::new();
            for node in current {
                match (segment, node) {
                    (Segment::Key(name), Value::Object(map)) => {
                        if let Some(child) = map.get(name) {
                            next.push(child);
                        }
                    }
                    (Segment::Index(i), Value::Array(items)) => {
                        if let Some(child) = items.get(*i) {
                            next.push(child);
                        }
                    }
                    (Segment::Wildcard, Value::Array(items)) => next.extend(items.iter()),
                    (Segment::Wildcard, Value::Object(map)) => next.extend(map.values()),
                    _ => {}
                }
            }
            if next.is_empty() {
                return next;
            }
            current = next;
        }

        current
    }

    /// Resolves the path and expands a trailing array into its elements.
    ///
    /// This is the view indexes use: an array of scalars indexes every element.
    /// `null` nodes are treated as absent.
    pub fn resolve_flat<'a>(&self, document: &'a Value) -> Vec<&'a Value> {
        let mut out = Vec::new();
        for node in self.resolve(document) {
            match node {
                Value::Array(items) => out.extend(items.iter().filter(|v| !v.is_null())),
                Value::Null => {}
                other => out.push(other),
            }
        }
        out
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
