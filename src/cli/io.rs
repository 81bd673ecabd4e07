//! JSON input and output for the CLI
//!
//! - Input: pipeline files holding a JSON stage array
//! - Output: pretty-printed JSON on stdout

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::aggregate::Stage;

use super::errors::{CliError, CliResult};

/// Reads a stage array such as
/// `[{"kind": "GROUPBY", "properties": ["@vax"], "reducers": [{"type": "COUNT", "as": "n"}]}]`
pub fn read_pipeline(path: &Path) -> CliResult<Vec<Stage>> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::io_error(format!("failed to read {}: {}", path.display(), e)))?;
    let stages: Vec<Stage> = serde_json::from_str(&content)?;
    Ok(stages)
}

/// Writes a value to stdout as pretty JSON
pub fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
