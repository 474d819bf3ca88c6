/// Formatter for LCOV data converted to JSON (`lcov-parse` and the tools built
/// on it).
///
///   [
///     {
///       "title": "",
///       "file": "/ci/src/app.js",
///       "lines": { "found": 3, "hit": 2, "details": [{ "line": 1, "hit": 4 }] },
///       "functions": { ... },
///       "branches": { ... }
///     }
///   ]
///
/// Only `lines.details` is read. As in the text form, negative hit counts mark
/// lines that are not instrumentable and are skipped.
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::Formatter;
use crate::model::*;

pub struct LcovJsonFormatter;

impl Formatter for LcovJsonFormatter {
    fn name(&self) -> &'static str {
        "lcov-json"
    }

    fn search_paths(&self) -> &'static [&'static str] {
        &["coverage/lcov.json", "lcov.json"]
    }

    fn recognizes(&self, _path: &Path, head: &str) -> bool {
        super::looks_like_json_array(head)
            && head.contains("\"file\"")
            && head.contains("\"details\"")
    }

    fn decode(&self, input: &[u8]) -> Result<CoverageData> {
        parse(input)
    }
}

#[derive(Deserialize)]
struct Record {
    file: String,
    #[serde(default)]
    lines: Lines,
}

#[derive(Deserialize, Default)]
struct Lines {
    #[serde(default)]
    details: Vec<Detail>,
}

#[derive(Deserialize)]
struct Detail {
    line: u32,
    hit: i64,
}

/// Parse lcov-json from raw bytes.
pub fn parse(input: &[u8]) -> Result<CoverageData> {
    let records: Vec<Record> =
        serde_json::from_slice(input).context("Invalid JSON in lcov-json report")?;

    let mut data = CoverageData::new();
    for record in records {
        let mut file = FileCoverage::new(record.file);
        for detail in record.lines.details {
            let line_number = check_line_number(detail.line)
                .with_context(|| format!("'{}'", file.path))?;
            if detail.hit >= 0 {
                file.push(line_number, detail.hit as u64);
            }
        }
        data.files.push(file);
    }
    Ok(data)
}
