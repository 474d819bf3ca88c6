mod common;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Context;
use covnorm::formatters::{Formatter, Registry};
use covnorm::model::{CoverageData, FileCoverage};

/// A dialect defined outside the crate: one `path hits...` record per line.
struct HitsFormatter {
    probes: Arc<AtomicUsize>,
}

impl Formatter for HitsFormatter {
    fn name(&self) -> &'static str {
        "hits"
    }

    fn search_paths(&self) -> &'static [&'static str] {
        &["out/hits.txt"]
    }

    fn recognizes(&self, _path: &Path, head: &str) -> bool {
        head.starts_with("# hits")
    }

    fn decode(&self, input: &[u8]) -> anyhow::Result<CoverageData> {
        let text = std::str::from_utf8(input)?;
        let mut data = CoverageData::new();
        for line in text.lines().filter(|l| !l.starts_with('#')) {
            let mut parts = line.split_whitespace();
            let path = parts.next().context("missing path")?;
            let mut file = FileCoverage::new(path.to_string());
            for (idx, hits) in parts.enumerate() {
                file.push(idx as u32 + 1, hits.parse()?);
            }
            data.files.push(file);
        }
        Ok(data)
    }

    fn search(
        &self,
        root: &Path,
        _candidates: &[std::path::PathBuf],
    ) -> covnorm::error::Result<covnorm::formatters::Located> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        covnorm::formatters::search_defaults(self.name(), root, self.search_paths())
    }
}

fn registry_with_hits(probes: &Arc<AtomicUsize>) -> Registry {
    Registry::new(vec![
        Box::new(covnorm::formatters::lcov::LcovFormatter),
        Box::new(HitsFormatter {
            probes: probes.clone(),
        }),
        Box::new(covnorm::formatters::gocov::GocovFormatter),
    ])
}

#[test]
fn custom_formatter_is_discovered() {
    let root = common::setup_root();
    common::write_file(root.path(), "out/hits.txt", b"# hits\n/w/a.rs 1 0 2\n");

    let probes = Arc::new(AtomicUsize::new(0));
    let registry = registry_with_hits(&probes);
    let (formatter, located) = covnorm::detect::discover(&registry, root.path()).unwrap();
    assert_eq!(formatter.name(), "hits");

    let report = formatter
        .format(formatter.parse(&located).unwrap(), &common::resolver("/w"))
        .unwrap();
    assert_eq!(common::names(&report), vec!["a.rs"]);
    assert_eq!(report.line_counts().covered, 2);
}

#[test]
fn earlier_match_skips_later_formatters() {
    let root = common::setup_root();
    common::write_file(root.path(), "lcov.info", b"SF:a\nDA:1,1\nend_of_record\n");
    common::write_file(root.path(), "out/hits.txt", b"# hits\na 1\n");

    let probes = Arc::new(AtomicUsize::new(0));
    let registry = registry_with_hits(&probes);
    let (formatter, _) = covnorm::detect::discover(&registry, root.path()).unwrap();

    assert_eq!(formatter.name(), "lcov");
    assert_eq!(probes.load(Ordering::SeqCst), 0);
}

#[test]
fn builtin_priority_order_breaks_ties() {
    let root = common::setup_root();
    // Both are plausible Cobertura inputs; cobertura is registered first.
    common::write_file(
        root.path(),
        "coverage.xml",
        include_bytes!("fixtures/sample_coveragepy.xml"),
    );
    common::write_file(
        root.path(),
        "cobertura.xml",
        include_bytes!("fixtures/sample_cobertura.xml"),
    );
    common::write_file(root.path(), "lcov.info", b"SF:a\nDA:1,1\nend_of_record\n");

    let registry = Registry::builtin();
    let (formatter, located) = covnorm::detect::discover(&registry, root.path()).unwrap();
    assert_eq!(formatter.name(), "cobertura");
    assert_eq!(located.path(), root.path().join("cobertura.xml"));
}

#[test]
fn not_found_lists_every_location_tried() {
    let root = common::setup_root();
    let registry = Registry::builtin();

    let err = covnorm::detect::select(&registry, "jacoco", root.path(), &[]).unwrap_err();
    let msg = err.to_string();
    assert!(msg.starts_with("jacoco:"), "{msg}");
    assert!(msg.contains("jacocoTestReport.xml"), "{msg}");
    assert!(msg.contains("jacoco.xml"), "{msg}");
}
