//! Pipeline compilation and execution
//!
//! Stages are compiled once against the index schema (expressions parsed,
//! fields resolved), then executed in order over an eager tuple vector.
//! The index read lock and the document store read lock are held for the
//! whole execution.

use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::expr::{parse_expression, Expr, Scalar};
use crate::index::{DocId, DocumentStore, IndexData, IndexManager};
use crate::observability::Event;
use crate::query::{self, Evaluator, SortDirection};
use crate::schema::{IndexSchema, JsonPath};

use super::errors::{AggregateError, AggregateResult};
use super::reducer::{Accumulator, KeyPart};
use super::sorter::TupleSorter;
use super::stage::{ReducerKind, Stage};
use super::tuple::Tuple;

/// Where a LOAD entry reads from
#[derive(Debug, Clone)]
enum FieldSource {
    /// Indexed value of the schema field at this position
    Schema(usize),
    /// Raw document body
    Path(JsonPath),
}

#[derive(Debug, Clone)]
struct LoadField {
    alias: String,
    source: FieldSource,
}

#[derive(Debug, Clone)]
struct CompiledReducer {
    kind: ReducerKind,
    property: Option<String>,
    output: String,
}

#[derive(Debug, Clone)]
enum CompiledStage {
    Load(Vec<LoadField>),
    Apply { expr: Expr, alias: String },
    GroupBy {
        properties: Vec<String>,
        reducers: Vec<CompiledReducer>,
    },
    Filter(Expr),
    SortBy {
        keys: Vec<String>,
        directions: Vec<SortDirection>,
        max: Option<usize>,
    },
    Limit { from: usize, size: usize },
}

/// A pipeline compiled against one index schema
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<CompiledStage>,
}

/// Strips the leading `@` of a property reference
fn property_name(stage: &'static str, raw: &str) -> AggregateResult<String> {
    let name = raw.trim();
    let name = name.strip_prefix('@').unwrap_or(name);
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(AggregateError::invalid_stage(
            stage,
            format!("'{}' is not a field reference", raw),
        ));
    }
    Ok(name.to_string())
}

/// `@alias`, `$.path`, either optionally followed by `AS name`
fn compile_load(raw: &str, schema: &IndexSchema) -> AggregateResult<LoadField> {
    let mut parts = raw.split_whitespace();
    let target = parts.next().unwrap_or_default();
    let rename = match (parts.next(), parts.next(), parts.next()) {
        (None, _, _) => None,
        (Some(kw), Some(name), None) if kw.eq_ignore_ascii_case("AS") => {
            Some(property_name("LOAD", name)?)
        }
        _ => {
            return Err(AggregateError::invalid_stage(
                "LOAD",
                format!("cannot parse '{}'", raw),
            ))
        }
    };

    if target.starts_with('$') {
        let path = JsonPath::parse(target)
            .map_err(|e| AggregateError::invalid_stage("LOAD", e.to_string()))?;
        let alias = rename.ok_or_else(|| {
            AggregateError::invalid_stage("LOAD", format!("path '{}' needs 'AS <name>'", target))
        })?;
        return Ok(LoadField {
            alias,
            source: FieldSource::Path(path),
        });
    }

    let name = property_name("LOAD", target)?;
    let (position, _) = schema.field(&name).ok_or_else(|| {
        AggregateError::Query(query::QueryError::UnknownField {
            index: schema.name().to_string(),
            alias: name.clone(),
        })
    })?;
    Ok(LoadField {
        alias: rename.unwrap_or(name),
        source: FieldSource::Schema(position),
    })
}

impl Pipeline {
    /// Compiles stage definitions. Expressions are parsed here, so syntax
    /// errors, unknown functions and arity mismatches surface before any
    /// tuple is produced.
    pub fn compile(stages: &[Stage], schema: &IndexSchema) -> AggregateResult<Self> {
        let mut compiled = Vec::with_capacity(stages.len());
        let mut grouped = false;

        for stage in stages {
            let next = match stage {
                Stage::Load { fields } => {
                    if grouped {
                        return Err(AggregateError::invalid_stage(
                            "LOAD",
                            "documents are no longer available after GROUPBY",
                        ));
                    }
                    let loads = fields
                        .iter()
                        .map(|f| compile_load(f, schema))
                        .collect::<AggregateResult<Vec<_>>>()?;
                    CompiledStage::Load(loads)
                }
                Stage::Apply { expression, alias } => CompiledStage::Apply {
                    expr: parse_expression(expression)?,
                    alias: property_name("APPLY", alias)?,
                },
                Stage::GroupBy {
                    properties,
                    reducers,
                } => {
                    if properties.is_empty() {
                        return Err(AggregateError::invalid_stage(
                            "GROUPBY",
                            "at least one property is required",
                        ));
                    }
                    let properties = properties
                        .iter()
                        .map(|p| property_name("GROUPBY", p))
                        .collect::<AggregateResult<Vec<_>>>()?;
                    let reducers = reducers
                        .iter()
                        .map(|r| -> AggregateResult<CompiledReducer> {
                            let property = match (&r.property, r.kind) {
                                (_, ReducerKind::Count) => None,
                                (Some(p), _) => Some(property_name("GROUPBY", p)?),
                                (None, kind) => {
                                    return Err(AggregateError::invalid_stage(
                                        "GROUPBY",
                                        format!("{} reducer needs a property", kind.name()),
                                    ))
                                }
                            };
                            Ok(CompiledReducer {
                                kind: r.kind,
                                property,
                                output: r.output_name(),
                            })
                        })
                        .collect::<AggregateResult<Vec<_>>>()?;
                    grouped = true;
                    CompiledStage::GroupBy {
                        properties,
                        reducers,
                    }
                }
                Stage::Filter { expression } => CompiledStage::Filter(parse_expression(expression)?),
                Stage::SortBy { by, max } => {
                    if by.is_empty() {
                        return Err(AggregateError::invalid_stage("SORTBY", "no sort keys"));
                    }
                    let keys = by
                        .iter()
                        .map(|k| property_name("SORTBY", &k.field))
                        .collect::<AggregateResult<Vec<_>>>()?;
                    CompiledStage::SortBy {
                        keys,
                        directions: by.iter().map(|k| k.direction).collect(),
                        max: *max,
                    }
                }
                Stage::Limit { from, size } => CompiledStage::Limit {
                    from: *from,
                    size: *size,
                },
            };
            compiled.push(next);
        }

        Ok(Self { stages: compiled })
    }

    /// Number of compiled stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs the pipeline over candidate documents
    pub fn execute(
        &self,
        candidates: impl IntoIterator<Item = DocId>,
        schema: &IndexSchema,
        data: &IndexData,
        store: &DocumentStore,
    ) -> AggregateResult<Vec<Tuple>> {
        let context = Context {
            schema,
            data,
            store,
        };
        let mut tuples: Vec<Tuple> = candidates.into_iter().map(Tuple::seeded).collect();

        for stage in &self.stages {
            tuples = context.run(stage, tuples)?;
        }
        Ok(tuples)
    }
}

/// Read access to the source index during execution
struct Context<'a> {
    schema: &'a IndexSchema,
    data: &'a IndexData,
    store: &'a DocumentStore,
}

impl Context<'_> {
    fn run(&self, stage: &CompiledStage, tuples: Vec<Tuple>) -> AggregateResult<Vec<Tuple>> {
        match stage {
            CompiledStage::Load(fields) => Ok(tuples
                .into_iter()
                .map(|mut tuple| {
                    for field in fields {
                        let value = self.load(&tuple, &field.source);
                        tuple.set(&field.alias, value);
                    }
                    tuple
                })
                .collect()),
            CompiledStage::Apply { expr, alias } => tuples
                .into_iter()
                .map(|mut tuple| -> AggregateResult<Tuple> {
                    let value = expr.evaluate(&tuple)?;
                    tuple.set(alias, value);
                    Ok(tuple)
                })
                .collect(),
            CompiledStage::GroupBy {
                properties,
                reducers,
            } => self.group(properties, reducers, tuples),
            CompiledStage::Filter(expr) => {
                let mut kept = Vec::with_capacity(tuples.len());
                for tuple in tuples {
                    match expr.evaluate(&tuple)? {
                        Scalar::Bool(true) => kept.push(tuple),
                        Scalar::Bool(false) => {}
                        other => return Err(AggregateError::NotBoolean(other.type_name())),
                    }
                }
                Ok(kept)
            }
            CompiledStage::SortBy {
                keys,
                directions,
                max,
            } => {
                let mut rows = tuples
                    .into_iter()
                    .map(|tuple| -> AggregateResult<(Vec<Scalar>, Tuple)> {
                        let values = keys
                            .iter()
                            .map(|k| self.resolve(&tuple, k))
                            .collect::<AggregateResult<Vec<_>>>()?;
                        Ok((values, tuple))
                    })
                    .collect::<AggregateResult<Vec<_>>>()?;
                TupleSorter::sort(&mut rows, directions);
                let keep = max.unwrap_or(usize::MAX);
                Ok(rows.into_iter().take(keep).map(|(_, tuple)| tuple).collect())
            }
            CompiledStage::Limit { from, size } => {
                Ok(tuples.into_iter().skip(*from).take(*size).collect())
            }
        }
    }

    fn load(&self, tuple: &Tuple, source: &FieldSource) -> Scalar {
        let Some(id) = tuple.source() else {
            return Scalar::Null;
        };
        match source {
            FieldSource::Schema(position) => self.indexed(id, *position),
            FieldSource::Path(path) => self
                .data
                .key(id)
                .and_then(|key| self.store.get(key))
                .and_then(|body| path.resolve(body).into_iter().find(|v| !v.is_null()))
                .map_or(Scalar::Null, Scalar::from_json),
        }
    }

    /// First indexed value of a schema field; null if absent
    fn indexed(&self, id: DocId, position: usize) -> Scalar {
        self.data
            .entry(id)
            .and_then(|entry| entry.get(position))
            .map_or(Scalar::Null, Scalar::from)
    }

    /// Bound value, falling back to the source document's schema field
    /// while the tuple still has a source.
    fn resolve(&self, tuple: &Tuple, alias: &str) -> AggregateResult<Scalar> {
        if let Some(value) = tuple.get(alias) {
            return Ok(value.clone());
        }
        match (tuple.source(), self.schema.field(alias)) {
            (Some(id), Some((position, _))) => Ok(self.indexed(id, position)),
            _ => Err(AggregateError::UnboundField(alias.to_string())),
        }
    }

    /// Partitions tuples by property values in first-appearance order and
    /// emits one tuple per group: properties, then reducer outputs.
    fn group(
        &self,
        properties: &[String],
        reducers: &[CompiledReducer],
        tuples: Vec<Tuple>,
    ) -> AggregateResult<Vec<Tuple>> {
        let mut positions: HashMap<Vec<KeyPart>, usize> = HashMap::new();
        let mut groups: Vec<(Vec<Scalar>, Vec<Accumulator>)> = Vec::new();

        for tuple in &tuples {
            let values = properties
                .iter()
                .map(|p| self.resolve(tuple, p))
                .collect::<AggregateResult<Vec<_>>>()?;
            let key: Vec<KeyPart> = values.iter().map(KeyPart::from).collect();

            let slot = match positions.get(&key) {
                Some(&slot) => slot,
                None => {
                    let accumulators = reducers.iter().map(|r| Accumulator::new(r.kind)).collect();
                    groups.push((values, accumulators));
                    positions.insert(key, groups.len() - 1);
                    groups.len() - 1
                }
            };

            let accumulators = &mut groups[slot].1;
            for (reducer, accumulator) in reducers.iter().zip(accumulators.iter_mut()) {
                match &reducer.property {
                    None => accumulator.update(None),
                    Some(property) => {
                        let value = self.resolve(tuple, property)?;
                        accumulator.update(Some(&value));
                    }
                }
            }
        }

        Ok(groups
            .into_iter()
            .map(|(values, accumulators)| {
                let mut fields: Vec<(String, Scalar)> =
                    properties.iter().cloned().zip(values).collect();
                for (reducer, accumulator) in reducers.iter().zip(&accumulators) {
                    fields.push((reducer.output.clone(), accumulator.finish()));
                }
                Tuple::from_fields(fields)
            })
            .collect())
    }
}

/// Rows produced by an aggregation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateOutput {
    /// Documents matched by the predicate
    pub total_candidates: usize,
    pub rows: Vec<Tuple>,
}

/// Runs `stages` over the documents of `index_name` matching `query`
pub fn aggregate(
    manager: &IndexManager,
    index_name: &str,
    query: &str,
    stages: &[Stage],
) -> AggregateResult<AggregateOutput> {
    let started = Instant::now();
    let index = manager.index(index_name)?;
    let schema = index.schema();

    let predicate = query::compile(query, schema)?;
    let pipeline = Pipeline::compile(stages, schema)?;

    let data = index.read();
    let candidates = Evaluator::new(schema, &data).evaluate(&predicate);
    let total_candidates = candidates.len();
    let store = manager.store();
    let rows = pipeline.execute(candidates, schema, &data, &store)?;

    debug!(
        event = %Event::AggregateComplete,
        index = index_name,
        query,
        stages = pipeline.len(),
        candidates = total_candidates,
        rows = rows.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "aggregate complete"
    );

    Ok(AggregateOutput {
        total_candidates,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Reducer;
    use crate::schema::FieldSchema;
    use serde_json::json;

    fn manager() -> IndexManager {
        let manager = IndexManager::new();
        manager
            .create_index(
                "condition_idx",
                "Condition:",
                vec![
                    FieldSchema::tag("$.clinicalStatus.coding[*].code", "code"),
                    FieldSchema::text("$.code.text", "problem"),
                    FieldSchema::tag("$.recordedDate", "date"),
                ],
            )
            .unwrap();
        for (i, year) in ["2020", "2020", "2019", "2020", "2019"].iter().enumerate() {
            manager
                .put(
                    &format!("Condition:{}", i),
                    json!({
                        "clinicalStatus": {"coding": [{"code": "active"}]},
                        "code": {"text": "Acute bronchitis"},
                        "recordedDate": format!("{}-03-0{}T10:00:00Z", year, i + 1),
                        "subject": {"reference": format!("Patient/{}", i)}
                    }),
                )
                .unwrap();
        }
        manager
    }

    fn rows(output: &AggregateOutput) -> serde_json::Value {
        serde_json::to_value(&output.rows).unwrap()
    }

    #[test]
    fn test_year_histogram() {
        let manager = manager();
        let stages = vec![
            Stage::load(["@date"]),
            Stage::apply("substr(@date,0,4)", "year"),
            Stage::group_by(["@year"], vec![Reducer::count("num")]),
        ];
        let output = aggregate(&manager, "condition_idx", "*", &stages).unwrap();
        assert_eq!(
            rows(&output),
            json!([{"year": "2020", "num": 3}, {"year": "2019", "num": 2}])
        );

        let mut sorted = stages.clone();
        sorted.push(Stage::sort_by("@year", SortDirection::Desc));
        let output = aggregate(&manager, "condition_idx", "*", &sorted).unwrap();
        assert_eq!(output.rows[0].get("year"), Some(&Scalar::from("2020")));
    }

    #[test]
    fn test_apply_on_unloaded_field_is_unbound() {
        let manager = manager();
        let stages = vec![Stage::apply("substr(@date,0,4)", "year")];
        let err = aggregate(&manager, "condition_idx", "*", &stages).unwrap_err();
        assert_eq!(err, AggregateError::UnboundField("date".into()));
    }

    #[test]
    fn test_group_by_schema_field_without_load() {
        let manager = manager();
        let stages = vec![Stage::group_by(["@code"], vec![Reducer::count("n")])];
        let output = aggregate(&manager, "condition_idx", "*", &stages).unwrap();
        assert_eq!(rows(&output), json!([{"code": "active", "n": 5}]));
    }

    #[test]
    fn test_load_path_with_alias() {
        let manager = manager();
        let stages = vec![
            Stage::load(["$.subject.reference AS patient"]),
            Stage::limit(0, 2),
        ];
        let output = aggregate(&manager, "condition_idx", "*", &stages).unwrap();
        assert_eq!(
            rows(&output),
            json!([{"patient": "Patient/0"}, {"patient": "Patient/1"}])
        );
    }

    #[test]
    fn test_filter_requires_boolean() {
        let manager = manager();
        let stages = vec![Stage::load(["@date"]), Stage::filter("strlen(@date)")];
        let err = aggregate(&manager, "condition_idx", "*", &stages).unwrap_err();
        assert_eq!(err, AggregateError::NotBoolean("number"));
    }

    #[test]
    fn test_compile_errors_before_execution() {
        let manager = manager();
        let index = manager.index("condition_idx").unwrap();

        let err = Pipeline::compile(&[Stage::apply("nosuch(@date)", "x")], index.schema()).unwrap_err();
        assert_eq!(err.code(), "FHIR_EXPRESSION");

        let err = Pipeline::compile(&[Stage::load(["@zip"])], index.schema()).unwrap_err();
        assert_eq!(err.code(), "FHIR_QUERY_SYNTAX");

        let stages = [
            Stage::group_by(["@code"], vec![Reducer::count("n")]),
            Stage::load(["@date"]),
        ];
        assert!(matches!(
            Pipeline::compile(&stages, index.schema()),
            Err(AggregateError::InvalidStage { stage: "LOAD", .. })
        ));
    }

    #[test]
    fn test_sort_after_group_on_unknown_field_is_unbound() {
        let manager = manager();
        let stages = vec![
            Stage::group_by(["@code"], vec![Reducer::count("n")]),
            Stage::sort_by("@date", SortDirection::Asc),
        ];
        let err = aggregate(&manager, "condition_idx", "*", &stages).unwrap_err();
        assert_eq!(err.code(), "FHIR_UNBOUND_FIELD");
    }
}
