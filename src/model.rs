//! Format-independent intermediate representation of parsed coverage data.
//! Formatters decode their input into a `CoverageData`, which is later folded
//! into a canonical [`Report`](crate::report::Report).

/// Compute a coverage rate, returning 0.0 when the total is zero.
#[must_use]
pub fn rate(covered: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        covered as f64 / total as f64
    }
}

/// Coverage percentage in the range 0–100, or 0.0 when the total is zero.
#[must_use]
pub fn percent(covered: u64, total: u64) -> f64 {
    rate(covered, total) * 100.0
}

/// Highest line number accepted from any input. Line numbers size the dense
/// per-line vector built for each file.
pub const MAX_LINE_NUMBER: u32 = 1 << 22;

/// Upper bound on the summed dense length of every file in one input.
pub const MAX_REPORT_LINES: u64 = 1 << 24;

/// Reject line numbers above [`MAX_LINE_NUMBER`].
pub fn check_line_number(line_number: u32) -> anyhow::Result<u32> {
    if line_number > MAX_LINE_NUMBER {
        anyhow::bail!("line number {line_number} exceeds the maximum of {MAX_LINE_NUMBER}");
    }
    Ok(line_number)
}

/// A single line that was instrumentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineCoverage {
    pub line_number: u32,
    pub hit_count: u64,
}

/// Coverage data for a single source file, exactly as the tool reported it.
#[derive(Debug, Clone, Default)]
pub struct FileCoverage {
    /// Raw path as emitted by the tool, before prefix rules are applied.
    pub path: String,
    /// Instrumentable lines. May be unsorted and may repeat a line number.
    pub lines: Vec<LineCoverage>,
    /// Physical line count when the tool reports one (array-based formats).
    pub line_count: Option<u32>,
}

impl FileCoverage {
    pub fn new(path: String) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }

    /// Record a hit count for a line.
    pub fn push(&mut self, line_number: u32, hit_count: u64) {
        self.lines.push(LineCoverage {
            line_number,
            hit_count,
        });
    }

    /// Build from an array indexed by `line - 1`, where `None` marks a line
    /// the tool does not track. The array length is the file's line count.
    pub fn from_line_array(path: String, entries: &[Option<u64>]) -> Self {
        let mut file = Self::new(path);
        for (idx, entry) in entries.iter().enumerate() {
            if let Some(hits) = entry {
                file.push(idx as u32 + 1, *hits);
            }
        }
        file.line_count = Some(entries.len() as u32);
        file
    }

    /// Length of the dense per-line vector this file expands to.
    pub fn dense_len(&self) -> u32 {
        let highest = self.lines.iter().map(|l| l.line_number).max().unwrap_or(0);
        highest.max(self.line_count.unwrap_or(0))
    }
}

/// The complete result of decoding a single coverage input.
#[derive(Debug, Clone, Default)]
pub struct CoverageData {
    pub files: Vec<FileCoverage>,
}

impl CoverageData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail when the files together would expand past [`MAX_REPORT_LINES`].
    pub fn check_size(&self) -> anyhow::Result<()> {
        let total: u64 = self.files.iter().map(|f| u64::from(f.dense_len())).sum();
        if total > MAX_REPORT_LINES {
            anyhow::bail!(
                "{} files span {total} lines, more than the maximum of {MAX_REPORT_LINES}",
                self.files.len()
            );
        }
        Ok(())
    }
}
