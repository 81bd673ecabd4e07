//! CLI module for fhirsearch
//!
//! Provides command-line interface for:
//! - scenarios: run the clinical scenarios over a bundle directory
//! - search: one-shot search
//! - aggregate: one-shot aggregation from a pipeline file
//! - indexes: list indexes and document counts

mod args;
mod commands;
mod errors;
mod io;
mod loader;
mod scenarios;

pub use args::{Cli, Command, Source};
pub use commands::{aggregate, indexes, run, run_command, scenarios, search};
pub use errors::{CliError, CliResult};
pub use io::{read_pipeline, write_json};
pub use loader::{load_bundle, load_bundles, resource_key, LoadSummary};
pub use scenarios::{
    build_indexes, clinical_indexes, run_scenarios, IndexDefinition, Request, Scenario,
    ScenarioOutcome,
};
pub use scenarios::scenarios as all_scenarios;
