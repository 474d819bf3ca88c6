//! Serialized form of a [`Report`].
//!
//! The document is rendered fully in memory and handed to the sink in a
//! single write. File sinks go through a temporary sibling that is renamed
//! over the destination, so readers never observe a partial document.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{CovnormError, Result};
use crate::report::{LineCounts, LineStatus, Report, ReportBuilder, SourceFile};

/// Version of the document layout written by [`save`].
pub const FORMAT_VERSION: u32 = 1;

/// Name used in errors about documents read back by [`load`].
const READER_NAME: &str = "covnorm";

#[derive(Serialize)]
struct Document<'a> {
    format_version: u32,
    run_at: String,
    covered_percent: f64,
    line_counts: LineCounts,
    source_files: &'a [SourceFile],
}

#[derive(Deserialize)]
struct StoredDocument {
    format_version: u32,
    source_files: Vec<StoredSourceFile>,
}

#[derive(Deserialize)]
struct StoredSourceFile {
    name: String,
    blob_id: Option<String>,
    coverage: Vec<LineStatus>,
}

/// Where a report goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    Stdout,
    File(PathBuf),
}

impl Sink {
    /// `-` means stdout; anything else is a file path.
    pub fn from_arg(path: &Path) -> Self {
        if path.as_os_str() == "-" {
            Sink::Stdout
        } else {
            Sink::File(path.to_path_buf())
        }
    }
}

impl std::fmt::Display for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sink::Stdout => f.write_str("stdout"),
            Sink::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Render the full document for `report`.
pub fn render(report: &Report) -> Result<Vec<u8>> {
    let doc = Document {
        format_version: FORMAT_VERSION,
        run_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        covered_percent: report.covered_percent(),
        line_counts: report.line_counts(),
        source_files: report.source_files(),
    };
    let mut bytes = serde_json::to_vec_pretty(&doc).map_err(|e| CovnormError::Write {
        sink: "document".to_string(),
        source: e.into(),
    })?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Write `report` to `writer` in one `write_all`.
pub fn save(report: &Report, writer: &mut dyn Write) -> Result<()> {
    let bytes = render(report)?;
    write_all(writer, &bytes, "writer")
}

/// Write `report` to `sink`.
pub fn save_to(report: &Report, sink: &Sink) -> Result<()> {
    match sink {
        Sink::Stdout => {
            let bytes = render(report)?;
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write_all(&mut lock, &bytes, "stdout")
        }
        Sink::File(path) => save_to_path(report, path),
    }
}

/// Atomically replace `path` with the rendered report, creating parent
/// directories as needed.
pub fn save_to_path(report: &Report, path: &Path) -> Result<()> {
    let bytes = render(report)?;
    let sink = path.display().to_string();
    let write_err = |source: std::io::Error| CovnormError::Write {
        sink: sink.clone(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
    write_all(tmp.as_file_mut(), &bytes, &sink)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    info!(
        path = %path.display(),
        files = report.source_files().len(),
        "wrote coverage report"
    );
    Ok(())
}

fn write_all(writer: &mut dyn Write, bytes: &[u8], sink: &str) -> Result<()> {
    writer
        .write_all(bytes)
        .and_then(|()| writer.flush())
        .map_err(|source| CovnormError::Write {
            sink: sink.to_string(),
            source,
        })
}

/// Read a document written by [`save`] back into a [`Report`].
///
/// Derived statistics are recomputed from the per-line coverage rather than
/// trusted from the document.
pub fn load(input: &[u8]) -> anyhow::Result<Report> {
    let doc: StoredDocument =
        serde_json::from_slice(input).context("Invalid JSON in coverage report document")?;
    if doc.format_version != FORMAT_VERSION {
        anyhow::bail!(
            "unsupported format_version {} (expected {})",
            doc.format_version,
            FORMAT_VERSION
        );
    }

    let mut builder = ReportBuilder::new(READER_NAME);
    for file in doc.source_files {
        builder.add(SourceFile::new(file.name, file.blob_id, file.coverage));
    }
    Ok(builder.build()?)
}

/// [`load`] from a file.
pub fn load_path(path: &Path) -> Result<Report> {
    let content = crate::formatters::read_input(READER_NAME, path)?;
    load(&content).map_err(|e| CovnormError::Parse {
        formatter: READER_NAME.to_string(),
        path: path.to_path_buf(),
        source: e.into(),
    })
}
