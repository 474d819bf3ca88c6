/// Formatter for Go's `-coverprofile` output.
///
/// Reference: https://go.dev/blog/cover
///
/// Format:
///   mode: set|count|atomic
///   <file>:<startLine>.<startCol>,<endLine>.<endCol> <numStatements> <count>
///
/// Each line describes a basic block. Blocks are expanded into per-line
/// entries carrying the block's hit count; where blocks overlap, the highest
/// count wins. Every line is written once, however many blocks cover it.
use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

use super::Formatter;
use crate::model::*;

/// Go coverage profile formatter.
pub struct GocovFormatter;

impl Formatter for GocovFormatter {
    fn name(&self) -> &'static str {
        "gocov"
    }

    fn search_paths(&self) -> &'static [&'static str] {
        &["c.out", "cover.out", "coverage.out"]
    }

    fn recognizes(&self, path: &Path, head: &str) -> bool {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            let ext = ext.to_lowercase();
            if ext == "coverprofile" || ext == "gocov" {
                return true;
            }
        }

        // Profiles without a mode header come out of some merge tools.
        if let Some(first) = head.lines().next() {
            if first.starts_with("mode: ") {
                return true;
            }
        }
        head.lines().any(looks_like_go_block)
    }

    fn decode(&self, input: &[u8]) -> Result<CoverageData> {
        parse(input)
    }
}

/// A parsed block from a single line of the coverage profile.
struct Block {
    start_line: u32,
    end_line: u32,
    count: u64,
}

/// e.g. "github.com/user/repo/file.go:10.1,20.5 3 1"
fn looks_like_go_block(line: &str) -> bool {
    let Some(colon_pos) = line.rfind(".go:") else {
        return false;
    };
    let after = &line[colon_pos + 4..];
    after.contains(',') && after.split_whitespace().count() >= 2
}

/// Parse a single block line, returning (file_path, Block).
fn parse_block_line(line: &str) -> Option<(&str, Block)> {
    // Anchor on the last ".go:" so paths containing colons still split.
    let colon_pos = line.rfind(".go:")? + 3;

    let file = &line[..colon_pos];
    let rest = &line[colon_pos + 1..];

    let (range, tail) = rest.split_once(' ')?;
    let (start, end) = range.split_once(',')?;

    let start_line: u32 = start.split_once('.')?.0.parse().ok()?;
    let end_line: u32 = end.split_once('.')?.0.parse().ok()?;
    if end_line < start_line {
        return None;
    }

    let mut parts = tail.split_whitespace();
    let _num_stmt: u32 = parts.next()?.parse().ok()?;
    let count: u64 = parts.next()?.parse().ok()?;

    Some((
        file,
        Block {
            start_line,
            end_line,
            count,
        },
    ))
}

/// Parse a Go coverage profile from raw bytes. One `FileCoverage` per source
/// file, in order of first appearance.
pub fn parse(input: &[u8]) -> Result<CoverageData> {
    let text = std::str::from_utf8(input).context("Invalid UTF-8 in Go coverage data")?;

    let mut file_order: Vec<&str> = Vec::new();
    let mut file_blocks: HashMap<&str, Vec<Block>> = HashMap::new();

    for (idx, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with("mode:") {
            continue;
        }

        let (file, block) = parse_block_line(line)
            .with_context(|| format!("line {}: malformed coverage block '{line}'", idx + 1))?;
        check_line_number(block.end_line).with_context(|| format!("line {}", idx + 1))?;
        file_blocks
            .entry(file)
            .or_insert_with(|| {
                file_order.push(file);
                Vec::new()
            })
            .push(block);
    }

    // Expansion allocates per file, so the budget is checked before it runs.
    let span: u64 = file_blocks
        .values()
        .map(|blocks| u64::from(blocks.iter().map(|b| b.end_line).max().unwrap_or(0)))
        .sum();
    if span > MAX_REPORT_LINES {
        anyhow::bail!(
            "{} files span {span} lines, more than the maximum of {MAX_REPORT_LINES}",
            file_blocks.len()
        );
    }

    let mut data = CoverageData::new();
    for file_path in file_order {
        if let Some(blocks) = file_blocks.remove(file_path) {
            data.files
                .push(blocks_to_file_coverage(file_path.to_string(), &blocks));
        }
    }
    Ok(data)
}

/// Go ranges are inclusive on both ends. The end line is included even when
/// the block ends at column 1, since there is no column-level granularity.
///
/// Blocks are applied from the highest count down, so the first block to
/// claim a line holds its maximum. `next[i]` links line `i` to the first line
/// at or after it that is still unclaimed.
fn blocks_to_file_coverage(path: String, blocks: &[Block]) -> FileCoverage {
    let last = blocks.iter().map(|b| b.end_line).max().unwrap_or(0);
    let mut hits: Vec<Option<u64>> = vec![None; last as usize + 1];
    let mut next: Vec<u32> = (0..=last + 1).collect();

    let mut by_count: Vec<&Block> = blocks.iter().collect();
    by_count.sort_by(|a, b| b.count.cmp(&a.count));
    for block in by_count {
        let mut line = unclaimed(&mut next, block.start_line);
        while line <= block.end_line {
            hits[line as usize] = Some(block.count);
            next[line as usize] = line + 1;
            line = unclaimed(&mut next, line + 1);
        }
    }

    let lines: Vec<LineCoverage> = hits
        .into_iter()
        .enumerate()
        .filter_map(|(line_number, hit_count)| {
            Some(LineCoverage {
                line_number: line_number as u32,
                hit_count: hit_count?,
            })
        })
        .collect();

    FileCoverage {
        path,
        lines,
        line_count: None,
    }
}

/// First unclaimed line at or after `line`, compressing the path behind it.
fn unclaimed(next: &mut [u32], line: u32) -> u32 {
    let mut root = line;
    while next[root as usize] != root {
        root = next[root as usize];
    }
    let mut cur = line;
    while next[cur as usize] != root {
        let up = next[cur as usize];
        next[cur as usize] = root;
        cur = up;
    }
    root
}
