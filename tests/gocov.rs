mod common;

use covnorm::formatters::gocov::GocovFormatter;
use covnorm::formatters::Formatter;
use covnorm::report::LineStatus::{Hit, NotTrackable};

#[test]
fn search_parse_format() {
    let root = common::setup_root();
    common::write_file(root.path(), "cover.out", include_bytes!("fixtures/sample.gocov"));

    let located = GocovFormatter.search(root.path(), &[]).unwrap();
    assert_eq!(located.path(), root.path().join("cover.out"));

    let parsed = GocovFormatter.parse(&located).unwrap();
    let resolver = covnorm::resolve::PathResolver::new(None, None);
    let report = GocovFormatter.format(parsed, &resolver).unwrap();

    assert_eq!(
        common::names(&report),
        vec![
            "github.com/user/project/main.go",
            "github.com/user/project/util.go"
        ]
    );

    let main = &report.source_files()[0];
    assert_eq!(main.coverage().len(), 16);
    assert_eq!(main.coverage()[8], NotTrackable);
    assert_eq!(main.coverage()[9], Hit(5));
    assert_eq!(main.coverage()[15], Hit(0));

    let lc = report.line_counts();
    assert_eq!((lc.covered, lc.missed, lc.total), (6, 3, 9));
}

#[test]
fn add_prefix_reroots_module_paths() {
    let root = common::setup_root();
    let path = common::write_file(
        root.path(),
        "c.out",
        b"mode: set\ngithub.com/user/project/pkg/a.go:1.1,2.2 1 1\n",
    );

    let resolver = covnorm::resolve::PathResolver::new(
        Some(std::path::Path::new("github.com/user/project")),
        Some("backend"),
    );
    let report = covnorm::ingest::format_file("gocov", &path, &resolver).unwrap();
    assert_eq!(common::names(&report), vec!["backend/pkg/a.go"]);
}

#[test]
fn ranked_default_locations() {
    let root = common::setup_root();
    common::write_file(root.path(), "coverage.out", b"mode: set\nx.go:1.1,1.2 1 0\n");
    common::write_file(root.path(), "c.out", b"mode: set\ny.go:1.1,1.2 1 1\n");

    let located = GocovFormatter.search(root.path(), &[]).unwrap();
    assert_eq!(located.path(), root.path().join("c.out"));
}
