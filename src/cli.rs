//! Command handler functions for the covnorm CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::fmt::Write;
use std::path::Path;

use anyhow::{bail, Result};

use crate::formatters::Registry;
use crate::ingest::{self, FormatOptions};
use crate::output;
use crate::report::LineStatus;
use crate::resolve::PathResolver;

/// Run the pipeline and describe what was written.
pub fn cmd_format_coverage(
    registry: &Registry,
    opts: &FormatOptions,
    resolver: &PathResolver,
) -> Result<String> {
    let formatted = ingest::format_coverage(registry, opts, resolver)?;
    let counts = formatted.report.line_counts();
    Ok(format!(
        "Formatted {} as '{}': {} files, {}/{} lines ({:.1}%) → {}\n",
        formatted.input.display(),
        formatted.formatter,
        formatted.report.source_files().len(),
        counts.covered,
        counts.total,
        formatted.report.covered_percent(),
        opts.output,
    ))
}

/// Registered formatters in discovery order, with their default locations.
pub fn cmd_formatters(registry: &Registry) -> String {
    let mut out = String::new();
    writeln!(out, "{:<14} DEFAULT LOCATIONS", "NAME").unwrap();
    writeln!(out, "{}", "-".repeat(70)).unwrap();
    for formatter in registry.iter() {
        let locations = match formatter.search_paths() {
            [] => "(search root)".to_string(),
            paths => paths.join(", "),
        };
        writeln!(out, "{:<14} {}", formatter.name(), locations).unwrap();
    }
    out
}

/// Totals and per-file coverage of a saved report.
pub fn cmd_summary(report_path: &Path, sort_by_coverage: bool) -> Result<String> {
    let report = output::load_path(report_path)?;
    let counts = report.line_counts();

    let mut out = String::new();
    writeln!(out, "Files:      {}", report.source_files().len()).unwrap();
    writeln!(
        out,
        "Lines:      {}/{} ({:.1}%)",
        counts.covered,
        counts.total,
        report.covered_percent()
    )
    .unwrap();
    writeln!(out).unwrap();

    let mut files: Vec<_> = report.source_files().iter().collect();
    if sort_by_coverage {
        files.sort_by(|a, b| a.covered_percent().total_cmp(&b.covered_percent()));
    }

    writeln!(
        out,
        "{:<60} {:>8} {:>8} {:>8}",
        "FILE", "LINES", "COVERED", "RATE"
    )
    .unwrap();
    writeln!(out, "{}", "-".repeat(88)).unwrap();
    for f in files {
        let lc = f.line_counts();
        writeln!(
            out,
            "{:<60} {:>8} {:>8} {:>7.1}%",
            f.name(),
            lc.total,
            lc.covered,
            f.covered_percent()
        )
        .unwrap();
    }
    Ok(out)
}

/// Uncovered lines of one file in a saved report, as compact ranges.
pub fn cmd_uncovered(report_path: &Path, source_file: &str) -> Result<String> {
    let report = output::load_path(report_path)?;
    let Some(file) = report.source_file(source_file) else {
        bail!("No coverage data for '{}'", source_file);
    };

    let uncovered: Vec<u32> = file
        .coverage()
        .iter()
        .enumerate()
        .filter(|(_, status)| **status == LineStatus::Hit(0))
        .map(|(idx, _)| idx as u32 + 1)
        .collect();

    if uncovered.is_empty() {
        return Ok(format!(
            "All instrumentable lines are covered in '{}'\n",
            source_file
        ));
    }

    let mut out = String::new();
    writeln!(out, "Uncovered lines in '{}':", source_file).unwrap();
    writeln!(out, "  {}", format_line_ranges(&uncovered)).unwrap();
    writeln!(out, "  ({} lines)", uncovered.len()).unwrap();
    Ok(out)
}

/// Collapse sorted line numbers into ranges, e.g. `1-3, 7, 9-10`.
pub fn format_line_ranges(lines: &[u32]) -> String {
    let mut ranges: Vec<String> = Vec::new();
    let mut iter = lines.iter().copied();
    let Some(first) = iter.next() else {
        return String::new();
    };

    let (mut start, mut end) = (first, first);
    for line in iter {
        if line == end + 1 {
            end = line;
            continue;
        }
        ranges.push(range_label(start, end));
        start = line;
        end = line;
    }
    ranges.push(range_label(start, end));
    ranges.join(", ")
}

fn range_label(start: u32, end: u32) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{}-{}", start, end)
    }
}
