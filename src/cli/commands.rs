//! CLI command implementations
//!
//! Every command follows the same sequence: load configuration, install
//! logging, build the clinical indexes, load the bundle directory, then run
//! its request and print JSON to stdout.

use std::path::Path;

use serde_json::json;
use tracing::info;

use crate::config::EngineConfig;
use crate::engine::SearchEngine;
use crate::observability::init_logging;
use crate::query::SearchOptions;

use super::args::{Command, Source};
use super::errors::CliResult;
use super::io::{read_pipeline, write_json};
use super::loader::load_bundles;
use super::scenarios::{build_indexes, run_scenarios};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Scenarios { source } => scenarios(&source),
        Command::Search {
            source,
            index,
            query,
            return_fields,
            offset,
            limit,
            sort_by,
            direction,
        } => {
            let mut options = SearchOptions::new().offset(offset);
            if !return_fields.is_empty() {
                options = options.return_fields(return_fields);
            }
            if let Some(limit) = limit {
                options = options.limit(limit);
            }
            if let Some(field) = sort_by {
                options = options.sort_by(field, direction);
            }
            search(&source, &index, &query, &options)
        }
        Command::Aggregate {
            source,
            index,
            query,
            pipeline,
        } => aggregate(&source, &index, &query, &pipeline),
        Command::Indexes { source } => indexes(&source),
    }
}

/// Loads configuration, installs logging and fills a fresh engine
fn boot(source: &Source) -> CliResult<SearchEngine> {
    let config = match &source.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    init_logging(&config.log_level);

    let engine = SearchEngine::new(config);
    let built = build_indexes(&engine)?;
    let summary = load_bundles(&engine, &source.data)?;
    info!(
        indexes = built,
        files = summary.files,
        documents = summary.documents,
        skipped = summary.skipped,
        "engine ready"
    );
    Ok(engine)
}

/// Runs every clinical scenario
pub fn scenarios(source: &Source) -> CliResult<()> {
    let engine = boot(source)?;
    let outcomes = run_scenarios(&engine)?;
    write_json(&outcomes)
}

/// Runs one search
pub fn search(source: &Source, index: &str, query: &str, options: &SearchOptions) -> CliResult<()> {
    let engine = boot(source)?;
    let result = engine.search(index, query, options)?;
    write_json(&result)
}

/// Runs one aggregation read from a pipeline file
pub fn aggregate(source: &Source, index: &str, query: &str, pipeline: &Path) -> CliResult<()> {
    let stages = read_pipeline(pipeline)?;
    let engine = boot(source)?;
    let output = engine.aggregate(index, query, &stages)?;
    write_json(&output)
}

/// Lists the registered indexes
pub fn indexes(source: &Source) -> CliResult<()> {
    let engine = boot(source)?;
    let infos = engine
        .list_indexes()
        .iter()
        .map(|name| engine.index_info(name))
        .collect::<Result<Vec<_>, _>>()?;
    let documents = engine.manager().document_count();
    write_json(&json!({ "documents": documents, "indexes": infos }))
}
