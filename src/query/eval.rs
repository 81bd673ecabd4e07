//! Predicate evaluation over per-field indexes
//!
//! Leaves resolve to document sets through their field's structure; AND
//! intersects, OR unions, NOT subtracts from all documents of the index.

use crate::index::{DocSet, FieldIndex, IndexData, TextIndex};
use crate::schema::{FieldType, IndexSchema};

use super::ast::{Matcher, Predicate, TextMatch};
use super::errors::{QueryError, QueryResult};

/// Checks every field leaf against the schema: the alias must exist and the
/// matcher must suit the field type.
pub fn check(predicate: &Predicate, schema: &IndexSchema) -> QueryResult<()> {
    let mut result = Ok(());
    predicate.for_each_field(&mut |alias, matcher| {
        if result.is_err() {
            return;
        }
        result = match schema.field(alias) {
            None => Err(QueryError::UnknownField {
                index: schema.name().to_string(),
                alias: alias.to_string(),
            }),
            Some((_, field)) => {
                let fits = matches!(
                    (field.field_type, matcher),
                    (FieldType::Tag, Matcher::Tags(_))
                        | (FieldType::Text, Matcher::Text(_))
                        | (FieldType::Numeric, Matcher::Range { .. })
                );
                if fits {
                    Ok(())
                } else {
                    Err(QueryError::WrongMatcher {
                        alias: alias.to_string(),
                        field_type: field.field_type.type_name(),
                        matcher: matcher.kind(),
                    })
                }
            }
        };
    });
    result
}

/// Evaluates checked predicates against one index's data
pub struct Evaluator<'a> {
    schema: &'a IndexSchema,
    data: &'a IndexData,
}

impl<'a> Evaluator<'a> {
    pub fn new(schema: &'a IndexSchema, data: &'a IndexData) -> Self {
        Self { schema, data }
    }

    /// Returns the matching documents in insertion order
    pub fn evaluate(&self, predicate: &Predicate) -> DocSet {
        match predicate {
            Predicate::All => self.data.all_docs(),
            Predicate::And(children) => {
                let mut result: Option<DocSet> = None;
                for child in children {
                    let set = self.evaluate(child);
                    let next = match result {
                        None => set,
                        Some(acc) => acc.intersection(&set).copied().collect(),
                    };
                    if next.is_empty() {
                        return next;
                    }
                    result = Some(next);
                }
                result.unwrap_or_default()
            }
            Predicate::Or(children) => {
                let mut result = DocSet::new();
                for child in children {
                    result.extend(self.evaluate(child));
                }
                result
            }
            Predicate::Not(inner) => {
                let excluded = self.evaluate(inner);
                self.data
                    .all_docs()
                    .into_iter()
                    .filter(|id| !excluded.contains(id))
                    .collect()
            }
            Predicate::Field { alias, matcher } => match self.schema.field(alias) {
                Some((position, _)) => self.leaf(self.data.field(position), matcher),
                None => DocSet::new(),
            },
            Predicate::AnyText(text) => {
                let mut result = DocSet::new();
                for position in 0..self.schema.fields().len() {
                    if let Some(index) = self.data.field(position).as_text() {
                        result.extend(text_match(index, text));
                    }
                }
                result
            }
        }
    }

    fn leaf(&self, index: &FieldIndex, matcher: &Matcher) -> DocSet {
        match (index, matcher) {
            (FieldIndex::Tag(tags), Matcher::Tags(values)) => tags.lookup_any(values.as_slice()),
            (FieldIndex::Text(text), Matcher::Text(alternatives)) => {
                let mut result = DocSet::new();
                for alternative in alternatives {
                    result.extend(text_match(text, alternative));
                }
                result
            }
            (FieldIndex::Numeric(numeric), Matcher::Range { min, max }) => {
                numeric.lookup_range(*min, *max)
            }
            _ => DocSet::new(),
        }
    }
}

fn text_match(index: &TextIndex, text: &TextMatch) -> DocSet {
    match text {
        TextMatch::Term(word) => index.term(word),
        TextMatch::Prefix(prefix) => index.prefix(prefix),
        TextMatch::Contains(fragment) => index.contains(fragment),
        TextMatch::Phrase(words) => index.phrase(words),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexManager;
    use crate::query::parse_query;
    use crate::schema::FieldSchema;
    use serde_json::json;

    fn manager() -> IndexManager {
        let manager = IndexManager::new();
        manager
            .create_index(
                "claims_idx",
                "Claim:",
                vec![
                    FieldSchema::tag("$.status", "status"),
                    FieldSchema::text("$.insurance[*].coverage.display", "insurer"),
                    FieldSchema::numeric("$.total.value", "value"),
                ],
            )
            .unwrap();
        let claims = [
            ("Claim:1", "active", "Aetna", 1000.0),
            ("Claim:2", "active", "Aetna", 999.999),
            ("Claim:3", "cancelled", "Aetna", 5000.0),
            ("Claim:4", "active", "Medicaid", 0.0),
        ];
        for (key, status, insurer, value) in claims {
            manager
                .put(
                    key,
                    json!({
                        "status": status,
                        "insurance": [{"coverage": {"display": insurer}}],
                        "total": {"value": value}
                    }),
                )
                .unwrap();
        }
        manager
    }

    fn run(manager: &IndexManager, query: &str) -> Vec<String> {
        let index = manager.index("claims_idx").unwrap();
        let predicate = parse_query(query).unwrap();
        check(&predicate, index.schema()).unwrap();
        let data = index.read();
        Evaluator::new(index.schema(), &data)
            .evaluate(&predicate)
            .into_iter()
            .map(|id| data.key(id).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_and_of_leaves() {
        let manager = manager();
        assert_eq!(
            run(&manager, "@insurer:Aetna @value:[1000,+inf] @status:{active}"),
            vec!["Claim:1"]
        );
    }

    #[test]
    fn test_or_not_and_all() {
        let manager = manager();
        assert_eq!(run(&manager, "*").len(), 4);
        assert_eq!(
            run(&manager, "@status:{cancelled} | @value:[-inf,0]"),
            vec!["Claim:3", "Claim:4"]
        );
        assert_eq!(run(&manager, "-@insurer:aetna"), vec!["Claim:4"]);
        assert_eq!(run(&manager, "medicaid"), vec!["Claim:4"]);
    }

    #[test]
    fn test_short_circuit_on_empty() {
        let manager = manager();
        assert!(run(&manager, "@status:{unknown} @insurer:aetna").is_empty());
    }

    #[test]
    fn test_check_rejects_unknown_alias_and_wrong_matcher() {
        let manager = manager();
        let index = manager.index("claims_idx").unwrap();
        let schema = index.schema();

        let err = check(&parse_query("@payer:{x}").unwrap(), schema).unwrap_err();
        assert!(matches!(err, QueryError::UnknownField { ref alias, .. } if alias == "payer"));

        let err = check(&parse_query("@status:active").unwrap(), schema).unwrap_err();
        assert!(matches!(err, QueryError::WrongMatcher { field_type: "TAG", .. }));

        let err = check(&parse_query("@value:{1}").unwrap(), schema).unwrap_err();
        assert_eq!(err.code(), "FHIR_QUERY_SYNTAX");
    }
}
