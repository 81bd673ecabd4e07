//! CLI argument definitions using clap
//!
//! Commands:
//! - fhirsearch scenarios --data <dir> [--config <path>]
//! - fhirsearch search --data <dir> --index <name> --query <q>
//! - fhirsearch aggregate --data <dir> --index <name> --query <q> --pipeline <path>
//! - fhirsearch indexes --data <dir>

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::query::SortDirection;

/// fhirsearch - search and aggregate FHIR bundles with a schema-driven index
#[derive(Parser, Debug)]
#[command(name = "fhirsearch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct Source {
    /// Directory of FHIR bundle files (*.json)
    #[arg(long, default_value = "./synthea/output/fhir")]
    pub data: PathBuf,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the clinical indexes, load bundles and run every scenario
    Scenarios {
        #[command(flatten)]
        source: Source,
    },

    /// Run a single search and print the matching documents
    Search {
        #[command(flatten)]
        source: Source,

        /// Index to search
        #[arg(long)]
        index: String,

        /// Query string, e.g. "(@status:{active} @state:{AK})"
        #[arg(long)]
        query: String,

        /// JSONPaths or aliases to return (comma separated)
        #[arg(long = "return", value_delimiter = ',')]
        return_fields: Vec<String>,

        /// Matches to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Page size
        #[arg(long)]
        limit: Option<usize>,

        /// Sortable field to order by
        #[arg(long)]
        sort_by: Option<String>,

        /// Sort direction (ASC or DESC)
        #[arg(long, default_value = "ASC")]
        direction: SortDirection,
    },

    /// Run an aggregation pipeline read from a JSON stage array
    Aggregate {
        #[command(flatten)]
        source: Source,

        /// Index to aggregate
        #[arg(long)]
        index: String,

        /// Query selecting the candidate documents
        #[arg(long, default_value = "*")]
        query: String,

        /// JSON file holding the stage array
        #[arg(long)]
        pipeline: PathBuf,
    },

    /// Print the registered indexes with document counts
    Indexes {
        #[command(flatten)]
        source: Source,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search() {
        let cli = Cli::try_parse_from([
            "fhirsearch",
            "search",
            "--data",
            "/tmp/fhir",
            "--index",
            "location_idx",
            "--query",
            "@status:{active}",
            "--return",
            "$.name,$.address.city",
            "--limit",
            "3",
            "--direction",
            "desc",
        ])
        .unwrap();

        match cli.command {
            Command::Search {
                source,
                return_fields,
                limit,
                offset,
                direction,
                ..
            } => {
                assert_eq!(source.data, PathBuf::from("/tmp/fhir"));
                assert_eq!(return_fields, vec!["$.name", "$.address.city"]);
                assert_eq!(limit, Some(3));
                assert_eq!(offset, 0);
                assert_eq!(direction, SortDirection::Desc);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_aggregate_requires_pipeline() {
        assert!(Cli::try_parse_from(["fhirsearch", "aggregate", "--index", "claims_idx"]).is_err());
    }
}
