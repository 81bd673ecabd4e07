//! Query predicate tree
//!
//! Produced by the parser without schema knowledge; field aliases and
//! matcher kinds are checked against an index schema before evaluation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::index::NumericBound;

/// One way of matching a TEXT field
#[derive(Debug, Clone, PartialEq)]
pub enum TextMatch {
    /// Exact token
    Term(String),
    /// `word*`: token starts with word
    Prefix(String),
    /// `%word%`: token contains word
    Contains(String),
    /// `"a b c"`: all words in order within one value
    Phrase(Vec<String>),
}

/// Field-level leaf predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// `{a|b}`: any of the literal tag values
    Tags(Vec<String>),
    /// `a|b*|%c%`: any of the text alternatives
    Text(Vec<TextMatch>),
    /// `[min max]`: numeric range
    Range { min: NumericBound, max: NumericBound },
}

impl Matcher {
    /// Name of the matcher kind for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Matcher::Tags(_) => "tag",
            Matcher::Text(_) => "text",
            Matcher::Range { .. } => "numeric range",
        }
    }
}

/// Boolean predicate tree
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `*`: every document of the index
    All,
    /// Juxtaposition: set intersection
    And(Vec<Predicate>),
    /// `|`: set union
    Or(Vec<Predicate>),
    /// `-x`: every document not matching x
    Not(Box<Predicate>),
    /// `@alias:matcher`
    Field { alias: String, matcher: Matcher },
    /// Bare term, matched against every TEXT field
    AnyText(TextMatch),
}

impl Predicate {
    /// Visits every field leaf of the tree
    pub fn for_each_field<'a>(&'a self, f: &mut impl FnMut(&'a str, &'a Matcher)) {
        match self {
            Predicate::All | Predicate::AnyText(_) => {}
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    child.for_each_field(f);
                }
            }
            Predicate::Not(inner) => inner.for_each_field(f),
            Predicate::Field { alias, matcher } => f(alias, matcher),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "asc")]
    Asc,
    #[serde(alias = "desc")]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn is_descending(&self) -> bool {
        matches!(self, SortDirection::Desc)
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            _ => Err(format!("invalid sort direction '{}'. Expected ASC or DESC", s)),
        }
    }
}
