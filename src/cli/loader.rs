//! FHIR bundle loader
//!
//! Every `*.json` file of a directory is a FHIR bundle; each
//! `entry[].resource` is stored under `<resourceType>:<id>`. Files are read
//! in name order so handle assignment is reproducible.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::engine::SearchEngine;
use crate::error::{Error, Result};
use crate::observability::Event;

/// Counts of one load run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub files: usize,
    pub documents: usize,
    /// Entries without a resource type or id
    pub skipped: usize,
}

/// Document key of a resource, `None` when type or id is missing
pub fn resource_key(resource: &Value) -> Option<String> {
    let resource_type = resource.get("resourceType")?.as_str()?;
    let id = match resource.get("id")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(format!("{}:{}", resource_type, id))
}

/// Bundle files of `dir`, sorted by name
fn bundle_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).map_err(|e| Error::io(format!("reading {}", dir.display()), e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| Error::io(format!("reading {}", dir.display()), e))?
            .path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Stores every resource of one bundle file
pub fn load_bundle(engine: &SearchEngine, path: &Path) -> Result<LoadSummary> {
    let context = || format!("loading {}", path.display());
    let content = fs::read_to_string(path).map_err(|e| Error::io(context(), e))?;
    let bundle: Value =
        serde_json::from_str(&content).map_err(|e| Error::io(context(), io::Error::from(e)))?;

    let mut summary = LoadSummary {
        files: 1,
        ..LoadSummary::default()
    };
    let entries = bundle
        .get("entry")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for entry in entries {
        let Some(resource) = entry.get("resource") else {
            summary.skipped += 1;
            continue;
        };
        match resource_key(resource) {
            Some(key) => {
                engine.put(&key, resource.clone())?;
                summary.documents += 1;
            }
            None => {
                warn!(file = %path.display(), "bundle entry without resourceType or id skipped");
                summary.skipped += 1;
            }
        }
    }

    info!(
        event = %Event::BundleLoaded,
        file = %path.display(),
        documents = summary.documents,
        skipped = summary.skipped,
        "bundle loaded"
    );
    Ok(summary)
}

/// Loads every bundle file of `dir`
pub fn load_bundles(engine: &SearchEngine, dir: &Path) -> Result<LoadSummary> {
    let mut total = LoadSummary::default();
    for path in bundle_files(dir)? {
        let summary = load_bundle(engine, &path)?;
        total.files += summary.files;
        total.documents += summary.documents;
        total.skipped += summary.skipped;
    }
    Ok(total)
}
