/// Formatter for SimpleCov's `coverage/.resultset.json`.
///
/// The result set maps a test-suite name to that suite's results:
///
///   {
///     "RSpec": {
///       "coverage": {
///         "/abs/path/lib/a.rb": { "lines": [1, null, 0], "branches": {...} },
///         "/abs/path/lib/b.rb": [1, 1, null]          // SimpleCov < 0.18
///       },
///       "timestamp": 1700000000
///     }
///   }
///
/// Each `lines` array is indexed by `line - 1`; `null` marks a line SimpleCov
/// does not track, and so does `"ignored"` (nocov blocks). Files covered by
/// more than one suite are emitted once per suite and merged downstream.
/// Suites and files keep their document order.
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use super::Formatter;
use crate::model::*;

pub struct SimplecovFormatter;

impl Formatter for SimplecovFormatter {
    fn name(&self) -> &'static str {
        "simplecov"
    }

    fn search_paths(&self) -> &'static [&'static str] {
        &["coverage/.resultset.json"]
    }

    fn recognizes(&self, path: &Path, head: &str) -> bool {
        if path.file_name().and_then(|n| n.to_str()) == Some(".resultset.json") {
            return true;
        }
        super::looks_like_json_object(head)
            && head.contains("\"coverage\"")
            && head.contains("\"timestamp\"")
    }

    fn decode(&self, input: &[u8]) -> Result<CoverageData> {
        parse(input)
    }
}

/// Parse a SimpleCov result set from raw bytes.
pub fn parse(input: &[u8]) -> Result<CoverageData> {
    let root: Value = serde_json::from_slice(input).context("Invalid JSON in SimpleCov result set")?;
    let suites = root
        .as_object()
        .context("SimpleCov result set must be a JSON object")?;

    let mut data = CoverageData::new();
    for (suite, result) in suites {
        let coverage = result
            .get("coverage")
            .and_then(Value::as_object)
            .with_context(|| format!("suite '{suite}' has no coverage object"))?;

        for (path, entry) in coverage {
            let lines = match entry {
                Value::Array(lines) => lines,
                Value::Object(obj) => obj
                    .get("lines")
                    .and_then(Value::as_array)
                    .with_context(|| format!("suite '{suite}': '{path}' has no lines array"))?,
                _ => anyhow::bail!("suite '{suite}': unexpected coverage entry for '{path}'"),
            };
            let entries: Vec<Option<u64>> = lines.iter().map(Value::as_u64).collect();
            data.files
                .push(FileCoverage::from_line_array(path.clone(), &entries));
        }
    }
    Ok(data)
}
