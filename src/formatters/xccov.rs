/// Formatter for Xcode coverage exported with `xcrun xccov view --json`.
///
/// The archive export (`--archive --json`) maps each source path to its lines:
///
///   {
///     "/Users/ci/App/Sources/App/Store.swift": [
///       { "line": 1, "isExecutable": false },
///       { "line": 2, "isExecutable": true, "executionCount": 3, "subranges": [] }
///     ]
///   }
///
/// A report export whose files carry the same per-line array is read too:
///
///   { "targets": [{ "files": [{ "path": "...", "lineCoverage": [ ... ] }] }] }
///
/// Lines that are not executable are untracked.
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use super::Formatter;
use crate::model::*;

pub struct XccovFormatter;

impl Formatter for XccovFormatter {
    fn name(&self) -> &'static str {
        "xccov"
    }

    fn search_paths(&self) -> &'static [&'static str] {
        &["xccov.json", "coverage/xccov.json"]
    }

    fn recognizes(&self, _path: &Path, head: &str) -> bool {
        super::looks_like_json_object(head) && head.contains("\"isExecutable\"")
    }

    fn decode(&self, input: &[u8]) -> Result<CoverageData> {
        parse(input)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineEntry {
    line: u32,
    is_executable: bool,
    #[serde(default)]
    execution_count: u64,
}

#[derive(Deserialize)]
struct Target {
    #[serde(default)]
    files: Vec<TargetFile>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetFile {
    path: String,
    line_coverage: Vec<LineEntry>,
}

/// Parse an xccov JSON export from raw bytes.
pub fn parse(input: &[u8]) -> Result<CoverageData> {
    let root: Value = serde_json::from_slice(input).context("Invalid JSON in xccov export")?;
    let mut root = match root {
        Value::Object(map) => map,
        _ => anyhow::bail!("xccov export must be a JSON object"),
    };

    let mut data = CoverageData::new();
    if let Some(targets) = root.remove("targets") {
        let targets: Vec<Target> =
            serde_json::from_value(targets).context("Invalid xccov targets")?;
        for file in targets.into_iter().flat_map(|t| t.files) {
            data.files.push(to_file_coverage(file.path, &file.line_coverage)?);
        }
        return Ok(data);
    }

    for (path, lines) in root {
        let lines: Vec<LineEntry> = serde_json::from_value(lines)
            .with_context(|| format!("Invalid xccov lines for '{path}'"))?;
        data.files.push(to_file_coverage(path, &lines)?);
    }
    Ok(data)
}

fn to_file_coverage(path: String, lines: &[LineEntry]) -> Result<FileCoverage> {
    let mut file = FileCoverage::new(path);
    for entry in lines {
        let line_number =
            check_line_number(entry.line).with_context(|| format!("'{}'", file.path))?;
        if entry.is_executable {
            file.push(line_number, entry.execution_count);
        }
    }
    Ok(file)
}
