//! Canonical coverage report and the builder that folds parsed files into it.
//!
//! All counting is done on integers; floating point only appears in the final
//! division, so the same input sequence always yields bit-identical output.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CovnormError, Result};
use crate::model::{percent, FileCoverage};
use crate::resolve::ResolvedPath;

/// Coverage state of one physical line.
///
/// Ordered `NotTrackable < Hit(0) < Hit(1) < ...`, which is the order used
/// when two reports of the same file are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Option<u64>", into = "Option<u64>")]
pub enum LineStatus {
    NotTrackable,
    Hit(u64),
}

impl LineStatus {
    pub fn is_trackable(self) -> bool {
        matches!(self, LineStatus::Hit(_))
    }

    pub fn is_covered(self) -> bool {
        matches!(self, LineStatus::Hit(n) if n > 0)
    }

    /// Combine two observations of the same line.
    #[must_use]
    pub fn merge(self, other: LineStatus) -> LineStatus {
        self.max(other)
    }
}

impl From<Option<u64>> for LineStatus {
    fn from(value: Option<u64>) -> Self {
        match value {
            Some(n) => LineStatus::Hit(n),
            None => LineStatus::NotTrackable,
        }
    }
}

impl From<LineStatus> for Option<u64> {
    fn from(value: LineStatus) -> Self {
        match value {
            LineStatus::Hit(n) => Some(n),
            LineStatus::NotTrackable => None,
        }
    }
}

/// Covered/missed/total trackable line counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCounts {
    pub covered: u64,
    pub missed: u64,
    pub total: u64,
}

impl LineCounts {
    pub fn from_coverage(coverage: &[LineStatus]) -> Self {
        let mut counts = LineCounts::default();
        for status in coverage {
            if status.is_covered() {
                counts.covered += 1;
            } else if status.is_trackable() {
                counts.missed += 1;
            }
        }
        counts.total = counts.covered + counts.missed;
        counts
    }

    fn add(&mut self, other: &LineCounts) {
        self.covered += other.covered;
        self.missed += other.missed;
        self.total = self.covered + self.missed;
    }
}

/// One file in the canonical report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFile {
    name: String,
    blob_id: Option<String>,
    coverage: Vec<LineStatus>,
    covered_percent: f64,
    line_counts: LineCounts,
}

impl SourceFile {
    /// `coverage[i]` describes line `i + 1`.
    pub fn new(name: String, blob_id: Option<String>, coverage: Vec<LineStatus>) -> Self {
        let line_counts = LineCounts::from_coverage(&coverage);
        Self {
            name,
            blob_id,
            covered_percent: file_percent(&line_counts),
            coverage,
            line_counts,
        }
    }

    /// Expand a sparse parsed file into the dense per-line representation.
    ///
    /// The vector is as long as the larger of the declared line count and the
    /// highest line number seen. Line number 0 is ignored; repeated line
    /// numbers keep the highest hit count.
    pub fn from_parsed(file: &FileCoverage, resolved: ResolvedPath) -> Self {
        let mut coverage = vec![LineStatus::NotTrackable; file.dense_len() as usize];
        for line in &file.lines {
            if line.line_number == 0 {
                continue;
            }
            let slot = &mut coverage[line.line_number as usize - 1];
            *slot = slot.merge(LineStatus::Hit(line.hit_count));
        }

        Self::new(resolved.name, resolved.blob_id, coverage)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn blob_id(&self) -> Option<&str> {
        self.blob_id.as_deref()
    }

    pub fn coverage(&self) -> &[LineStatus] {
        &self.coverage
    }

    pub fn line_counts(&self) -> LineCounts {
        self.line_counts
    }

    pub fn covered_percent(&self) -> f64 {
        self.covered_percent
    }

    /// Fold another observation of the same file into this one.
    fn merge(&mut self, other: SourceFile) {
        if other.coverage.len() > self.coverage.len() {
            self.coverage
                .resize(other.coverage.len(), LineStatus::NotTrackable);
        }
        for (slot, status) in self.coverage.iter_mut().zip(other.coverage) {
            *slot = slot.merge(status);
        }
        if self.blob_id.is_none() {
            self.blob_id = other.blob_id;
        }
        self.line_counts = LineCounts::from_coverage(&self.coverage);
        self.covered_percent = file_percent(&self.line_counts);
    }
}

/// A file without trackable lines counts as fully covered.
fn file_percent(counts: &LineCounts) -> f64 {
    if counts.total == 0 {
        100.0
    } else {
        percent(counts.covered, counts.total)
    }
}

/// Canonical coverage report. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    covered_percent: f64,
    line_counts: LineCounts,
    source_files: Vec<SourceFile>,
}

impl Report {
    pub fn source_files(&self) -> &[SourceFile] {
        &self.source_files
    }

    pub fn line_counts(&self) -> LineCounts {
        self.line_counts
    }

    pub fn covered_percent(&self) -> f64 {
        self.covered_percent
    }

    pub fn source_file(&self, name: &str) -> Option<&SourceFile> {
        self.source_files.iter().find(|f| f.name == name)
    }
}

/// Collects source files in insertion order, merging files with equal names.
pub struct ReportBuilder {
    formatter: String,
    files: Vec<SourceFile>,
    index: HashMap<String, usize>,
}

impl ReportBuilder {
    /// `formatter` names the producer, for error reporting.
    pub fn new(formatter: &str) -> Self {
        Self {
            formatter: formatter.to_string(),
            files: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn add(&mut self, file: SourceFile) {
        match self.index.get(&file.name) {
            Some(&idx) => {
                debug!(name = %file.name, "merging duplicate source file");
                self.files[idx].merge(file);
            }
            None => {
                self.index.insert(file.name.clone(), self.files.len());
                self.files.push(file);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Compute aggregate statistics. Fails when no files were added.
    pub fn build(self) -> Result<Report> {
        if self.files.is_empty() {
            return Err(CovnormError::EmptyReport {
                formatter: self.formatter,
            });
        }

        let mut line_counts = LineCounts::default();
        for file in &self.files {
            line_counts.add(&file.line_counts);
        }

        Ok(Report {
            covered_percent: percent(line_counts.covered, line_counts.total),
            line_counts,
            source_files: self.files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LineStatus::{Hit, NotTrackable};

    fn file(name: &str, coverage: Vec<LineStatus>) -> SourceFile {
        SourceFile::new(name.to_string(), None, coverage)
    }

    fn resolved(name: &str) -> ResolvedPath {
        ResolvedPath {
            name: name.to_string(),
            blob_id: None,
        }
    }

    #[test]
    fn test_line_counts() {
        let counts = LineCounts::from_coverage(&[NotTrackable, Hit(3), Hit(0), Hit(1)]);
        assert_eq!(
            counts,
            LineCounts {
                covered: 2,
                missed: 1,
                total: 3
            }
        );
    }

    #[test]
    fn test_file_without_trackable_lines_is_fully_covered() {
        let f = file("README.md", vec![NotTrackable, NotTrackable]);
        assert_eq!(f.covered_percent(), 100.0);
        assert_eq!(f.line_counts().total, 0);

        let empty = file("empty.rs", vec![]);
        assert_eq!(empty.covered_percent(), 100.0);
    }

    #[test]
    fn test_aggregate_is_weighted_not_averaged() {
        let mut builder = ReportBuilder::new("test");
        // 9/9 covered
        builder.add(file("big.rs", vec![Hit(1); 9]));
        // 0/1 covered
        builder.add(file("small.rs", vec![Hit(0)]));
        let report = builder.build().unwrap();

        assert_eq!(
            report.line_counts(),
            LineCounts {
                covered: 9,
                missed: 1,
                total: 10
            }
        );
        assert_eq!(report.covered_percent(), 90.0);
    }

    #[test]
    fn test_counts_are_consistent() {
        let mut builder = ReportBuilder::new("test");
        builder.add(file("a.rs", vec![Hit(2), NotTrackable, Hit(0), Hit(0)]));
        builder.add(file("b.rs", vec![NotTrackable, Hit(7)]));
        builder.add(file("c.rs", vec![NotTrackable]));
        let report = builder.build().unwrap();

        let lc = report.line_counts();
        assert_eq!(lc.covered + lc.missed, lc.total);
        let expected = lc.covered as f64 / lc.total as f64 * 100.0;
        assert!((report.covered_percent() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_zero_total_report_is_zero_percent() {
        let mut builder = ReportBuilder::new("test");
        builder.add(file("docs.md", vec![NotTrackable; 3]));
        let report = builder.build().unwrap();
        assert_eq!(report.line_counts().total, 0);
        assert_eq!(report.covered_percent(), 0.0);
        assert_eq!(report.source_files()[0].covered_percent(), 100.0);
    }

    #[test]
    fn test_empty_builder_fails() {
        let err = ReportBuilder::new("lcov").build().unwrap_err();
        assert!(matches!(err, CovnormError::EmptyReport { ref formatter } if formatter == "lcov"));
    }

    #[test]
    fn test_duplicate_names_are_merged() {
        let mut builder = ReportBuilder::new("test");
        builder.add(file("a.rs", vec![Hit(0), Hit(2), NotTrackable]));
        builder.add(file("b.rs", vec![Hit(1)]));
        builder.add(file("a.rs", vec![Hit(4), Hit(0), Hit(0), Hit(1)]));
        assert_eq!(builder.len(), 2);
        let report = builder.build().unwrap();

        // Original insertion position is kept.
        assert_eq!(report.source_files()[0].name(), "a.rs");
        assert_eq!(report.source_files()[1].name(), "b.rs");

        let a = report.source_file("a.rs").unwrap();
        assert_eq!(a.coverage(), &[Hit(4), Hit(2), Hit(0), Hit(1)]);
        assert_eq!(
            a.line_counts(),
            LineCounts {
                covered: 3,
                missed: 1,
                total: 4
            }
        );
        assert_eq!(report.line_counts().total, 5);
    }

    #[test]
    fn test_merge_keeps_first_blob() {
        let mut builder = ReportBuilder::new("test");
        builder.add(SourceFile::new("a.rs".into(), None, vec![Hit(0)]));
        builder.add(SourceFile::new("a.rs".into(), Some("abc".into()), vec![Hit(1)]));
        builder.add(SourceFile::new("a.rs".into(), Some("def".into()), vec![Hit(1)]));
        let report = builder.build().unwrap();
        assert_eq!(report.source_files()[0].blob_id(), Some("abc"));
    }

    #[test]
    fn test_line_status_merge_order() {
        assert_eq!(NotTrackable.merge(Hit(0)), Hit(0));
        assert_eq!(Hit(0).merge(NotTrackable), Hit(0));
        assert_eq!(Hit(0).merge(Hit(3)), Hit(3));
        assert_eq!(Hit(5).merge(Hit(3)), Hit(5));
        assert_eq!(NotTrackable.merge(NotTrackable), NotTrackable);
    }

    #[test]
    fn test_from_parsed_dense_coverage() {
        let mut parsed = FileCoverage::new("/src/lib.rs".to_string());
        parsed.push(4, 2);
        parsed.push(2, 0);
        parsed.push(4, 7);
        parsed.push(0, 9);

        let sf = SourceFile::from_parsed(&parsed, resolved("src/lib.rs"));
        assert_eq!(sf.name(), "src/lib.rs");
        assert_eq!(sf.coverage(), &[NotTrackable, Hit(0), NotTrackable, Hit(7)]);
    }

    #[test]
    fn test_from_parsed_uses_declared_line_count() {
        let parsed = FileCoverage::from_line_array("a.rb".to_string(), &[Some(1), None, None]);
        let sf = SourceFile::from_parsed(&parsed, resolved("a.rb"));
        assert_eq!(sf.coverage().len(), 3);
        assert_eq!(sf.covered_percent(), 100.0);
    }

    #[test]
    fn test_line_status_serde() {
        let json = serde_json::to_string(&vec![NotTrackable, Hit(0), Hit(12)]).unwrap();
        assert_eq!(json, "[null,0,12]");
        let back: Vec<LineStatus> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![NotTrackable, Hit(0), Hit(12)]);
    }
}
