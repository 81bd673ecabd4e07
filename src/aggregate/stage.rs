//! Pipeline stage definitions
//!
//! Stages are plain data, deserializable from JSON such as
//! `{"kind": "APPLY", "expression": "ceil(@meters)", "as": "miles"}`.
//! They are compiled against an index schema before execution.

use serde::{Deserialize, Serialize};

use crate::query::{SortBy, SortDirection};

/// Reducer functions available to GROUPBY
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReducerKind {
    /// Number of tuples in the group; ignores its property
    Count,
    /// Number of distinct non-null property values
    CountDistinct,
    Sum,
    Min,
    Max,
    Avg,
}

impl ReducerKind {
    pub fn name(&self) -> &'static str {
        match self {
            ReducerKind::Count => "COUNT",
            ReducerKind::CountDistinct => "COUNT_DISTINCT",
            ReducerKind::Sum => "SUM",
            ReducerKind::Min => "MIN",
            ReducerKind::Max => "MAX",
            ReducerKind::Avg => "AVG",
        }
    }
}

/// One reducer of a GROUPBY stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reducer {
    #[serde(rename = "type")]
    pub kind: ReducerKind,
    /// `@alias` the reducer folds over
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    /// Output field; defaults to `<kind>_<property>` in lowercase
    #[serde(rename = "as", default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Reducer {
    pub fn new(kind: ReducerKind, property: Option<&str>, alias: &str) -> Self {
        Self {
            kind,
            property: property.map(String::from),
            alias: Some(alias.to_string()),
        }
    }

    pub fn count(alias: &str) -> Self {
        Self::new(ReducerKind::Count, None, alias)
    }

    pub fn sum(property: &str, alias: &str) -> Self {
        Self::new(ReducerKind::Sum, Some(property), alias)
    }

    /// Output field name
    pub fn output_name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        let kind = self.kind.name().to_ascii_lowercase();
        match &self.property {
            Some(property) => format!("{}_{}", kind, property.trim_start_matches('@')),
            None => kind,
        }
    }
}

/// One pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "UPPERCASE")]
pub enum Stage {
    /// Bind fields: `@alias`, `$.path`, optionally followed by `AS name`
    Load { fields: Vec<String> },
    /// Bind the result of an expression
    Apply {
        expression: String,
        #[serde(rename = "as")]
        alias: String,
    },
    /// Partition by properties and fold each group with reducers
    GroupBy {
        properties: Vec<String>,
        #[serde(default)]
        reducers: Vec<Reducer>,
    },
    /// Keep tuples for which the expression is true
    Filter { expression: String },
    /// Stable multi-key sort, optionally keeping only the first `max`
    SortBy {
        by: Vec<SortBy>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<usize>,
    },
    /// Keep `[from, from + size)`
    Limit { from: usize, size: usize },
}

impl Stage {
    pub fn load<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Stage::Load {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn apply(expression: &str, alias: &str) -> Self {
        Stage::Apply {
            expression: expression.to_string(),
            alias: alias.to_string(),
        }
    }

    pub fn group_by<I, S>(properties: I, reducers: Vec<Reducer>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Stage::GroupBy {
            properties: properties.into_iter().map(Into::into).collect(),
            reducers,
        }
    }

    pub fn filter(expression: &str) -> Self {
        Stage::Filter {
            expression: expression.to_string(),
        }
    }

    pub fn sort_by(field: &str, direction: SortDirection) -> Self {
        Stage::SortBy {
            by: vec![SortBy {
                field: field.to_string(),
                direction,
            }],
            max: None,
        }
    }

    pub fn limit(from: usize, size: usize) -> Self {
        Stage::Limit { from, size }
    }

    /// Stage keyword for messages
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Load { .. } => "LOAD",
            Stage::Apply { .. } => "APPLY",
            Stage::GroupBy { .. } => "GROUPBY",
            Stage::Filter { .. } => "FILTER",
            Stage::SortBy { .. } => "SORTBY",
            Stage::Limit { .. } => "LIMIT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stage_json() {
        let stages: Vec<Stage> = serde_json::from_value(json!([
            {"kind": "LOAD", "fields": ["@date"]},
            {"kind": "APPLY", "expression": "substr(@date,0,4)", "as": "year"},
            {"kind": "GROUPBY", "properties": ["@year"],
             "reducers": [{"type": "COUNT", "property": "@year", "as": "num_conditions"}]},
            {"kind": "SORTBY", "by": [{"field": "@year", "direction": "DESC"}]},
            {"kind": "LIMIT", "from": 0, "size": 5}
        ]))
        .unwrap();

        assert_eq!(stages[0], Stage::load(["@date"]));
        assert_eq!(stages[1], Stage::apply("substr(@date,0,4)", "year"));
        assert_eq!(
            stages[2],
            Stage::group_by(
                ["@year"],
                vec![Reducer::new(ReducerKind::Count, Some("@year"), "num_conditions")]
            )
        );
        assert_eq!(stages[3], Stage::sort_by("@year", SortDirection::Desc));
        assert_eq!(stages[4], Stage::limit(0, 5));
    }

    #[test]
    fn test_reducer_default_name() {
        let reducer: Reducer =
            serde_json::from_value(json!({"type": "COUNT_DISTINCT", "property": "@vax"})).unwrap();
        assert_eq!(reducer.output_name(), "count_distinct_vax");
        assert_eq!(Reducer::count("n").output_name(), "n");
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result: Result<Stage, _> = serde_json::from_value(json!({"kind": "UNWIND"}));
        assert!(result.is_err());
    }
}
