//! Query engine
//!
//! Executes a search in four steps: parse and check the predicate, evaluate
//! it under the index read lock, order and page the matches, then project
//! each page document from the document store.

use std::time::Instant;

use serde_json::{Map, Value};
use tracing::debug;

use crate::expr::Scalar;
use crate::index::{DocId, IndexData, IndexManager};
use crate::observability::Event;
use crate::schema::{IndexSchema, JsonPath};

use super::ast::{Predicate, SortDirection};
use super::errors::{QueryError, QueryResult};
use super::eval::{check, Evaluator};
use super::parser::parse_query;
use super::result::{SearchDocument, SearchOptions, SearchResult};

/// Parses a query and checks it against a schema
pub fn compile(query: &str, schema: &IndexSchema) -> QueryResult<Predicate> {
    let predicate = parse_query(query)?;
    check(&predicate, schema)?;
    Ok(predicate)
}

/// A compiled `return_fields` entry
struct Projection {
    name: String,
    path: JsonPath,
}

fn compile_projections(
    fields: &[String],
    schema: &IndexSchema,
) -> QueryResult<Vec<Projection>> {
    fields
        .iter()
        .map(|name| {
            let path = if name.starts_with('$') {
                JsonPath::parse(name)
                    .map_err(|e| QueryError::syntax(0, format!("return field: {}", e)))?
            } else {
                let alias = name.strip_prefix('@').unwrap_or(name);
                let (position, _) = schema.field(alias).ok_or_else(|| QueryError::UnknownField {
                    index: schema.name().to_string(),
                    alias: alias.to_string(),
                })?;
                schema.path(position).clone()
            };
            Ok(Projection {
                name: name.clone(),
                path,
            })
        })
        .collect()
}

/// Resolves projections against a body. One match yields the value, several
/// yield an array, none omits the field.
fn project(body: &Value, projections: Option<&[Projection]>) -> Map<String, Value> {
    let mut fields = Map::new();
    let Some(projections) = projections else {
        fields.insert("$".to_string(), body.clone());
        return fields;
    };

    for projection in projections {
        let mut nodes: Vec<Value> = projection
            .path
            .resolve(body)
            .into_iter()
            .filter(|v| !v.is_null())
            .cloned()
            .collect();
        match nodes.len() {
            0 => {}
            1 => {
                fields.insert(projection.name.clone(), nodes.remove(0));
            }
            _ => {
                fields.insert(projection.name.clone(), Value::Array(nodes));
            }
        }
    }
    fields
}

/// Stable sort of matches on a sortable field; absent values last
fn sort_matches(ids: &mut [DocId], data: &IndexData, position: usize, direction: SortDirection) {
    let descending = direction.is_descending();
    let mut keyed: Vec<(Scalar, DocId)> = ids
        .iter()
        .map(|&id| {
            let key = data
                .entry(id)
                .and_then(|entry| entry.get(position))
                .map_or(Scalar::Null, Scalar::from);
            (key, id)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.sort_cmp(&b.0, descending));
    for (slot, (_, id)) in ids.iter_mut().zip(keyed) {
        *slot = id;
    }
}

/// Runs a search against a registered index
pub fn search(
    manager: &IndexManager,
    index_name: &str,
    query: &str,
    options: &SearchOptions,
) -> QueryResult<SearchResult> {
    let started = Instant::now();
    let index = manager.index(index_name)?;
    let schema = index.schema();

    let predicate = compile(query, schema)?;
    let projections = options
        .return_fields
        .as_deref()
        .map(|fields| compile_projections(fields, schema))
        .transpose()?;
    let sort = match &options.sort_by {
        None => None,
        Some(sort_by) => {
            let alias = sort_by.field.strip_prefix('@').unwrap_or(&sort_by.field);
            match schema.field(alias) {
                Some((position, field)) if field.sortable => Some((position, sort_by.direction)),
                Some(_) => return Err(QueryError::NotSortable(alias.to_string())),
                None => {
                    return Err(QueryError::UnknownField {
                        index: schema.name().to_string(),
                        alias: alias.to_string(),
                    })
                }
            }
        }
    };

    let data = index.read();
    let mut ids: Vec<DocId> = Evaluator::new(schema, &data)
        .evaluate(&predicate)
        .into_iter()
        .collect();
    if let Some((position, direction)) = sort {
        sort_matches(&mut ids, &data, position, direction);
    }

    let total_matched = ids.len();
    let store = manager.store();
    let documents: Vec<SearchDocument> = ids
        .into_iter()
        .skip(options.offset)
        .take(options.limit.unwrap_or(usize::MAX))
        .filter_map(|id| {
            let key = data.key(id)?;
            let body = store.get(key)?;
            Some(SearchDocument {
                key: key.to_string(),
                fields: project(body, projections.as_deref()),
            })
        })
        .collect();

    debug!(
        event = %Event::SearchComplete,
        index = index_name,
        query,
        total_matched,
        returned = documents.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "search complete"
    );

    Ok(SearchResult {
        total_matched,
        documents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSchema;
    use serde_json::json;

    fn manager() -> IndexManager {
        let manager = IndexManager::new();
        manager
            .create_index(
                "loc_idx",
                "Location:",
                vec![
                    FieldSchema::tag("$.status", "status"),
                    FieldSchema::text("$.name", "name").sortable(),
                    FieldSchema::tag("$.address.state", "state"),
                    FieldSchema::tag("$.address.city", "city"),
                ],
            )
            .unwrap();
        for (id, name, state, city) in [
            ("1", "Providence Alaska Medical Center", "AK", "Anchorage"),
            ("2", "Denali Clinic", "AK", "Fairbanks"),
            ("3", "Pikes Peak Hospital", "CO", "Woodland Park"),
            ("4", "Alaska Native Medical Center", "AK", "Anchorage"),
        ] {
            manager
                .put(
                    &format!("Location:{}", id),
                    json!({
                        "status": "active",
                        "name": name,
                        "address": {"state": state, "city": city, "line": ["1 Main St", "Suite 2"]}
                    }),
                )
                .unwrap();
        }
        manager
    }

    #[test]
    fn test_search_with_projection_and_paging() {
        let manager = manager();
        let options = SearchOptions::new()
            .return_fields(["$.name", "$.address.city"])
            .limit(2);
        let result = search(&manager, "loc_idx", "(@status:{active} @state:{AK})", &options).unwrap();

        assert_eq!(result.total_matched, 3);
        assert_eq!(result.keys(), vec!["Location:1", "Location:2"]);
        assert_eq!(
            Value::Object(result.documents[1].fields.clone()),
            json!({"$.name": "Denali Clinic", "$.address.city": "Fairbanks"})
        );
    }

    #[test]
    fn test_projection_forms() {
        let manager = manager();
        let options = SearchOptions::new().return_fields(["@city", "$.address.line[*]", "$.missing"]);
        let result = search(&manager, "loc_idx", "@state:{CO}", &options).unwrap();

        assert_eq!(
            Value::Object(result.documents[0].fields.clone()),
            json!({"@city": "Woodland Park", "$.address.line[*]": ["1 Main St", "Suite 2"]})
        );
    }

    #[test]
    fn test_whole_body_without_projection() {
        let manager = manager();
        let result = search(&manager, "loc_idx", "@state:{CO}", &SearchOptions::new()).unwrap();
        assert_eq!(result.documents[0].fields["$"]["name"], json!("Pikes Peak Hospital"));
    }

    #[test]
    fn test_offset_past_end_is_empty() {
        let manager = manager();
        let result = search(&manager, "loc_idx", "*", &SearchOptions::new().offset(10)).unwrap();
        assert_eq!(result.total_matched, 4);
        assert!(result.documents.is_empty());
    }

    #[test]
    fn test_sort_by_sortable_field() {
        let manager = manager();
        let options = SearchOptions::new().sort_by("name", SortDirection::Asc);
        let result = search(&manager, "loc_idx", "@state:{AK}", &options).unwrap();
        assert_eq!(result.keys(), vec!["Location:4", "Location:2", "Location:1"]);

        let options = SearchOptions::new().sort_by("state", SortDirection::Asc);
        assert_eq!(
            search(&manager, "loc_idx", "*", &options).unwrap_err(),
            QueryError::NotSortable("state".into())
        );
    }

    #[test]
    fn test_errors() {
        let manager = manager();
        let err = search(&manager, "nope_idx", "*", &SearchOptions::new()).unwrap_err();
        assert_eq!(err.code(), "FHIR_UNKNOWN_INDEX");

        let err = search(&manager, "loc_idx", "(@status:{active}", &SearchOptions::new()).unwrap_err();
        assert!(matches!(err, QueryError::Syntax { .. }));

        let options = SearchOptions::new().return_fields(["@zip"]);
        let err = search(&manager, "loc_idx", "*", &options).unwrap_err();
        assert!(matches!(err, QueryError::UnknownField { .. }));
    }
}
