#![no_main]
use libfuzzer_sys::fuzz_target;

use covnorm::report::{ReportBuilder, SourceFile};
use covnorm::resolve::PathResolver;

fuzz_target!(|data: &[u8]| {
    // Whatever the decoder accepts must fold into a consistent report.
    let Ok(parsed) = covnorm::formatters::lcov::parse(data) else {
        return;
    };
    let resolver = PathResolver::default();
    let mut builder = ReportBuilder::new("lcov");
    for file in &parsed.files {
        builder.add(SourceFile::from_parsed(file, resolver.resolve(&file.path)));
    }
    if let Ok(report) = builder.build() {
        let lc = report.line_counts();
        assert_eq!(lc.covered + lc.missed, lc.total);
        assert!((0.0..=100.0).contains(&report.covered_percent()));
    }
});
