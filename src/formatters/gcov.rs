/// Formatter for gcov's annotated-source text output (`*.gcov`).
///
/// ```text
///         -:    0:Source:src/main.c
///         -:    0:Graph:main.gcno
///         -:    1:#include <stdio.h>
///         1:    2:int main(void) {
///     #####:    3:    never_called();
///        1*:    4:    if (x) y();
/// ```
///
/// The first column is the execution count: `-` for lines gcov does not
/// track, `#####`/`=====` for unexecuted lines, and a trailing `*` marks
/// partially executed blocks. Function, call and branch summary lines are
/// skipped. gcov writes one file per source, so the input is usually a
/// directory of `*.gcov` files.
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use super::{read_head, read_input, Formatter, Located, Parsed};
use crate::error::CovnormError;
use crate::model::*;

static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(-|#####|=====|\$\$\$\$\$|%%%%%|\d+\*?):\s*(\d+):(.*)$").unwrap()
});

pub struct GcovFormatter;

impl Formatter for GcovFormatter {
    fn name(&self) -> &'static str {
        "gcov"
    }

    /// gcov output has no fixed name; the search root itself is probed.
    fn search_paths(&self) -> &'static [&'static str] {
        &[]
    }

    fn recognizes(&self, path: &Path, head: &str) -> bool {
        if path.extension().and_then(|e| e.to_str()) == Some("gcov") {
            return true;
        }
        head.lines()
            .next()
            .and_then(|l| LINE_RE.captures(l))
            .is_some_and(|caps| &caps[2] == "0" && caps[3].starts_with("Source:"))
    }

    fn decode(&self, input: &[u8]) -> Result<CoverageData> {
        parse(input)
    }

    /// Accepts a directory holding `*.gcov` files as well as a single file.
    fn search(&self, root: &Path, candidates: &[PathBuf]) -> crate::error::Result<Located> {
        let targets: Vec<PathBuf> = if candidates.is_empty() {
            vec![root.to_path_buf()]
        } else {
            candidates.iter().map(|c| root.join(c)).collect()
        };

        for path in &targets {
            let found = if path.is_dir() {
                gcov_files(path).map(|files| !files.is_empty())
            } else if path.is_file() {
                read_head(path).map(|head| self.recognizes(path, &head))
            } else {
                Ok(false)
            };
            match found {
                Ok(true) => return Ok(Located::new(path.clone())),
                Ok(false) => {}
                Err(e) => debug!(path = %path.display(), "unreadable: {e}"),
            }
        }
        Err(CovnormError::NotFound {
            formatter: self.name().to_string(),
            tried: targets,
        })
    }

    fn parse(&self, located: &Located) -> crate::error::Result<Parsed> {
        let files = if located.path().is_dir() {
            gcov_files(located.path())?
        } else {
            vec![located.path().to_path_buf()]
        };

        let mut data = CoverageData::new();
        for path in files {
            debug!(path = %path.display(), "reading gcov file");
            let content = read_input(self.name(), &path)?;
            let decoded = parse(&content).map_err(|e| CovnormError::Parse {
                formatter: self.name().to_string(),
                path: path.clone(),
                source: e.into(),
            })?;
            data.files.extend(decoded.files);
        }
        data.check_size().map_err(|e| CovnormError::Parse {
            formatter: self.name().to_string(),
            path: located.path().to_path_buf(),
            source: e.into(),
        })?;
        Ok(Parsed::new(located.path().to_path_buf(), data))
    }
}

/// `*.gcov` files directly inside `dir`, in name order.
fn gcov_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("gcov") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Parse one gcov text file.
pub fn parse(input: &[u8]) -> Result<CoverageData> {
    let text = std::str::from_utf8(input).context("Invalid UTF-8 in gcov data")?;

    let mut source: Option<String> = None;
    let mut lines = Vec::new();
    let mut highest = 0u32;

    for raw_line in text.lines() {
        let Some(caps) = LINE_RE.captures(raw_line) else {
            continue;
        };
        let line_number: u32 = caps[2]
            .parse()
            .with_context(|| format!("bad line number in '{raw_line}'"))?;
        let line_number = check_line_number(line_number)?;

        if line_number == 0 {
            if let Some(path) = caps[3].strip_prefix("Source:") {
                source = Some(path.trim().to_string());
            }
            continue;
        }
        highest = highest.max(line_number);

        let hit_count = match &caps[1] {
            "-" => continue,
            "#####" | "=====" | "$$$$$" | "%%%%%" => 0,
            count => count
                .trim_end_matches('*')
                .parse::<u64>()
                .with_context(|| format!("bad execution count in '{raw_line}'"))?,
        };
        lines.push(LineCoverage {
            line_number,
            hit_count,
        });
    }

    let mut data = CoverageData::new();
    if lines.is_empty() && source.is_none() {
        return Ok(data);
    }
    let path = source.context("gcov file has no Source: header")?;
    data.files.push(FileCoverage {
        path,
        lines,
        line_count: Some(highest),
    });
    Ok(data)
}
