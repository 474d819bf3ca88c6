/// LCOV tracefile (`.info`) formatter.
///
/// Reference: https://ltp.sourceforge.net/coverage/lcov/geninfo.1.php
///
/// Records used:
///   SF:<path to source file>
///   DA:<line number>,<execution count>[,<checksum>]
///   end_of_record
///
/// Function, branch and summary records (FN, FNDA, BRDA, LF, LH, ...) are
/// skipped; line totals are derived from the DA records.
use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};

use super::Formatter;
use crate::model::*;

/// LCOV format formatter.
pub struct LcovFormatter;

impl Formatter for LcovFormatter {
    fn name(&self) -> &'static str {
        "lcov"
    }

    fn search_paths(&self) -> &'static [&'static str] {
        &["coverage/lcov.info", "lcov.info"]
    }

    fn recognizes(&self, path: &Path, head: &str) -> bool {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            let ext = ext.to_lowercase();
            if ext == "info" || ext == "lcov" {
                return true;
            }
        }

        // Lines must actually start with the tags to avoid false positives
        // on files that merely contain these strings.
        let has_sf = head.lines().any(|l| l.trim_start().starts_with("SF:"));
        let has_da = head.lines().any(|l| l.trim_start().starts_with("DA:"));
        has_sf && has_da
    }

    fn decode(&self, input: &[u8]) -> Result<CoverageData> {
        parse(input)
    }
}

/// Parse LCOV data from raw bytes.
pub fn parse(input: &[u8]) -> Result<CoverageData> {
    let mut data = CoverageData::new();
    let mut reader: &[u8] = input;
    let mut current_file: Option<FileCoverage> = None;

    let mut raw_line = String::new();
    let mut line_no = 0usize;
    loop {
        raw_line.clear();
        let n = reader
            .read_line(&mut raw_line)
            .context("Invalid UTF-8 in LCOV data")?;
        if n == 0 {
            break;
        }
        line_no += 1;

        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if line == "end_of_record" {
            if let Some(file) = current_file.take() {
                data.files.push(file);
            }
            continue;
        }

        let Some((tag, value)) = line.split_once(':') else {
            continue;
        };

        match tag {
            "SF" => {
                if let Some(file) = current_file.take() {
                    data.files.push(file);
                }
                current_file = Some(FileCoverage::new(value.to_string()));
            }
            "DA" => {
                let file = current_file
                    .as_mut()
                    .with_context(|| format!("line {line_no}: DA record outside of SF block"))?;
                let mut parts = value.splitn(3, ',');
                let (Some(number), Some(count)) = (parts.next(), parts.next()) else {
                    anyhow::bail!("line {line_no}: malformed DA record '{value}'");
                };
                let line_number: u32 = number
                    .trim()
                    .parse()
                    .with_context(|| format!("line {line_no}: bad line number '{number}'"))?;
                let line_number = check_line_number(line_number)
                    .with_context(|| format!("line {line_no}: DA record"))?;
                // Some instrumenters use negative counts (e.g. -1) for
                // non-instrumentable lines; those are skipped.
                let count: i64 = count
                    .trim()
                    .parse()
                    .with_context(|| format!("line {line_no}: bad execution count '{count}'"))?;
                if count >= 0 {
                    file.push(line_number, count as u64);
                }
            }
            _ => {}
        }
    }

    // Trailing record without end_of_record.
    if let Some(file) = current_file.take() {
        data.files.push(file);
    }

    Ok(data)
}
