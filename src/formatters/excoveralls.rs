/// Formatter for ExCoveralls JSON (`mix coveralls.json`).
///
///   {
///     "source_files": [
///       { "name": "lib/app.ex", "source": "...", "coverage": [null, 1, 0] }
///     ]
///   }
///
/// `coverage` is indexed by `line - 1`; `null` marks an untracked line.
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::Formatter;
use crate::model::*;

pub struct ExcoverallsFormatter;

impl Formatter for ExcoverallsFormatter {
    fn name(&self) -> &'static str {
        "excoveralls"
    }

    fn search_paths(&self) -> &'static [&'static str] {
        &["cover/excoveralls.json"]
    }

    fn recognizes(&self, _path: &Path, head: &str) -> bool {
        super::looks_like_json_object(head) && head.contains("\"source_files\"")
    }

    fn decode(&self, input: &[u8]) -> Result<CoverageData> {
        parse(input)
    }
}

#[derive(Deserialize)]
struct Document {
    source_files: Vec<SourceEntry>,
}

#[derive(Deserialize)]
struct SourceEntry {
    name: String,
    coverage: Vec<Option<u64>>,
}

/// Parse ExCoveralls JSON from raw bytes.
pub fn parse(input: &[u8]) -> Result<CoverageData> {
    let doc: Document =
        serde_json::from_slice(input).context("Invalid JSON in ExCoveralls report")?;

    let mut data = CoverageData::new();
    for entry in doc.source_files {
        data.files
            .push(FileCoverage::from_line_array(entry.name, &entry.coverage));
    }
    Ok(data)
}
