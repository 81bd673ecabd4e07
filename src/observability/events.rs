//! Observable events
//!
//! Every log line emitted at a subsystem boundary carries one of these as
//! its `event` field, so logs can be filtered by a stable name.

use std::fmt;

/// Lifecycle events of the search engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    // Index lifecycle
    /// Index registered and backfilled
    IndexCreated,
    /// Index removed
    IndexDropped,

    // Writes
    /// Document entry upserted into one index
    DocumentIndexed,
    /// Field value could not be coerced and was skipped
    FieldSkipped,

    // Reads
    SearchComplete,
    AggregateComplete,

    // Loading
    /// FHIR bundle file stored
    BundleLoaded,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::IndexCreated => "INDEX_CREATED",
            Event::IndexDropped => "INDEX_DROPPED",
            Event::DocumentIndexed => "DOCUMENT_INDEXED",
            Event::FieldSkipped => "FIELD_SKIPPED",
            Event::SearchComplete => "SEARCH_COMPLETE",
            Event::AggregateComplete => "AGGREGATE_COMPLETE",
            Event::BundleLoaded => "BUNDLE_LOADED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_unique_screaming_case() {
        let events = [
            Event::IndexCreated,
            Event::IndexDropped,
            Event::DocumentIndexed,
            Event::FieldSkipped,
            Event::SearchComplete,
            Event::AggregateComplete,
            Event::BundleLoaded,
        ];
        let mut names: Vec<&str> = events.iter().map(Event::as_str).collect();
        for name in &names {
            assert!(name.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), events.len());
    }

    #[test]
    fn test_display_matches_as_str() {
        assert_eq!(Event::BundleLoaded.to_string(), "BUNDLE_LOADED");
    }
}
