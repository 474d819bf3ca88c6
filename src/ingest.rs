use std::path::{Path, PathBuf};

use tracing::info;

use crate::detect;
use crate::error::Result;
use crate::formatters::Registry;
use crate::output::{self, Sink};
use crate::report::Report;
use crate::resolve::PathResolver;

/// Everything one `format-coverage` run needs.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Explicit input file; requires `input_type`.
    pub coverage_path: Option<PathBuf>,
    /// Formatter name; when absent the registry is probed.
    pub input_type: Option<String>,
    pub output: Sink,
    /// Directory that default locations are relative to.
    pub search_root: PathBuf,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            coverage_path: None,
            input_type: None,
            output: Sink::File(PathBuf::from("coverage/covnorm.json")),
            search_root: PathBuf::from("."),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct Formatted {
    pub formatter: &'static str,
    pub input: PathBuf,
    pub report: Report,
}

/// Select a formatter, then search, parse and format its input.
pub fn build_report(
    registry: &Registry,
    opts: &FormatOptions,
    resolver: &PathResolver,
) -> Result<Formatted> {
    let (formatter, located) = match &opts.input_type {
        Some(name) => {
            let candidates: Vec<PathBuf> = opts.coverage_path.iter().cloned().collect();
            detect::select(registry, name, &opts.search_root, &candidates)?
        }
        None => detect::discover(registry, &opts.search_root)?,
    };

    let input = located.path().to_path_buf();
    let parsed = formatter.parse(&located)?;
    info!(
        formatter = formatter.name(),
        files = parsed.data().files.len(),
        "parsed {}",
        input.display()
    );
    let report = formatter.format(parsed, resolver)?;

    Ok(Formatted {
        formatter: formatter.name(),
        input,
        report,
    })
}

/// Full pipeline: build the report, then write it to the configured sink.
/// Nothing is written unless the report is valid.
pub fn format_coverage(
    registry: &Registry,
    opts: &FormatOptions,
    resolver: &PathResolver,
) -> Result<Formatted> {
    let formatted = build_report(registry, opts, resolver)?;
    output::save_to(&formatted.report, &opts.output)?;
    Ok(formatted)
}

/// Convenience for callers that only have an input file and a format name.
pub fn format_file(formatter: &str, path: &Path, resolver: &PathResolver) -> Result<Report> {
    let registry = Registry::builtin();
    let opts = FormatOptions {
        coverage_path: Some(path.to_path_buf()),
        input_type: Some(formatter.to_string()),
        ..Default::default()
    };
    Ok(build_report(&registry, &opts, resolver)?.report)
}
