/// Formatter for the XML report written by `coverage xml` (coverage.py).
///
/// The document follows the Cobertura grammar; only the default location and
/// the recognition marker differ.
use std::path::Path;

use anyhow::Result;

use super::{cobertura, Formatter};
use crate::model::CoverageData;

pub struct CoveragePyFormatter;

impl Formatter for CoveragePyFormatter {
    fn name(&self) -> &'static str {
        "coverage.py"
    }

    fn search_paths(&self) -> &'static [&'static str] {
        &["coverage.xml"]
    }

    fn recognizes(&self, _path: &Path, head: &str) -> bool {
        // e.g. <!-- Generated by coverage.py: https://coverage.readthedocs.io/en/7.4.0 -->
        super::looks_like_xml(head) && head.contains("<coverage") && head.contains("coverage.py")
    }

    fn decode(&self, input: &[u8]) -> Result<CoverageData> {
        cobertura::parse(input)
    }
}
