mod common;

use covnorm::error::CovnormError;
use covnorm::formatters::Registry;
use covnorm::ingest::{self, FormatOptions};
use covnorm::output::{self, Sink};

/// Test the full pipeline: discover, parse, format and write to disk.
#[test]
fn format_coverage_auto_detect() {
    let root = common::setup_root();
    common::write_file(
        root.path(),
        "coverage/lcov.info",
        include_bytes!("fixtures/e2e.lcov"),
    );
    let out_path = root.path().join("out/covnorm.json");

    let opts = FormatOptions {
        output: Sink::File(out_path.clone()),
        search_root: root.path().to_path_buf(),
        ..Default::default()
    };
    let formatted = ingest::format_coverage(
        &Registry::builtin(),
        &opts,
        &common::resolver("/home/ci/app"),
    )
    .unwrap();

    assert_eq!(formatted.formatter, "lcov");
    assert_eq!(formatted.input, root.path().join("coverage/lcov.info"));

    let saved = output::load_path(&out_path).unwrap();
    assert_eq!(saved, formatted.report);
    assert_eq!(saved.line_counts().total, 57);
}

#[test]
fn explicit_type_and_path() {
    let root = common::setup_root();
    common::write_file(
        root.path(),
        "reports/py.xml",
        include_bytes!("fixtures/sample_coveragepy.xml"),
    );

    let opts = FormatOptions {
        coverage_path: Some("reports/py.xml".into()),
        input_type: Some("coverage.py".to_string()),
        output: Sink::File(root.path().join("covnorm.json")),
        search_root: root.path().to_path_buf(),
    };
    let formatted = ingest::format_coverage(
        &Registry::builtin(),
        &opts,
        &common::resolver("/home/ci/app"),
    )
    .unwrap();

    assert_eq!(formatted.formatter, "coverage.py");
    assert_eq!(
        common::names(&formatted.report),
        vec!["app/models.py", "app/views.py"]
    );
}

#[test]
fn explicit_type_uses_default_locations() {
    let root = common::setup_root();
    common::write_file(root.path(), "lcov.info", b"SF:a.rs\nDA:1,1\nend_of_record\n");

    let opts = FormatOptions {
        input_type: Some("lcov".to_string()),
        output: Sink::File(root.path().join("covnorm.json")),
        search_root: root.path().to_path_buf(),
        ..Default::default()
    };
    let formatted =
        ingest::build_report(&Registry::builtin(), &opts, &common::resolver("/")).unwrap();
    assert_eq!(formatted.input, root.path().join("lcov.info"));
}

#[test]
fn nothing_to_discover() {
    let root = common::setup_root();
    let opts = FormatOptions {
        search_root: root.path().to_path_buf(),
        ..Default::default()
    };

    let err = ingest::build_report(&Registry::builtin(), &opts, &common::resolver("/"))
        .unwrap_err();
    match err {
        CovnormError::NoFormatterFound { known } => {
            assert_eq!(known.len(), 11);
            assert!(known.contains(&"simplecov".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_input_type() {
    let root = common::setup_root();
    let opts = FormatOptions {
        input_type: Some("istanbul".to_string()),
        search_root: root.path().to_path_buf(),
        ..Default::default()
    };

    let err = ingest::build_report(&Registry::builtin(), &opts, &common::resolver("/"))
        .unwrap_err();
    assert!(err.to_string().contains("istanbul"));
    assert!(matches!(err, CovnormError::UnknownFormatter { .. }));
}

/// An invalid report must never reach the sink.
#[test]
fn empty_report_writes_nothing() {
    let root = common::setup_root();
    common::write_file(root.path(), "c.out", b"mode: set\n");
    let out_path = root.path().join("covnorm.json");

    let opts = FormatOptions {
        output: Sink::File(out_path.clone()),
        search_root: root.path().to_path_buf(),
        ..Default::default()
    };
    let err = ingest::format_coverage(&Registry::builtin(), &opts, &common::resolver("/"))
        .unwrap_err();

    assert!(matches!(err, CovnormError::EmptyReport { ref formatter } if formatter == "gocov"));
    assert!(!out_path.exists());
}

#[test]
fn parse_failure_keeps_existing_output() {
    let root = common::setup_root();
    common::write_file(root.path(), "cobertura.xml", b"<coverage><packages></coverage>");
    let out_path = common::write_file(root.path(), "covnorm.json", b"previous");

    let opts = FormatOptions {
        output: Sink::File(out_path.clone()),
        search_root: root.path().to_path_buf(),
        ..Default::default()
    };
    let err = ingest::format_coverage(&Registry::builtin(), &opts, &common::resolver("/"))
        .unwrap_err();

    assert!(matches!(err, CovnormError::Parse { .. }));
    assert_eq!(std::fs::read(&out_path).unwrap(), b"previous");
}
