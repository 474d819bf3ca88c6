//! The formatter contract and the registry of built-in coverage dialects.
//!
//! Every dialect implements four hooks (`name`, `search_paths`, `recognizes`,
//! `decode`) and inherits the three pipeline operations:
//!
//!   search → [`Located`] → parse → [`Parsed`] → format → [`Report`]
//!
//! `Located` and `Parsed` can only be obtained from the previous step, so the
//! operations cannot be called out of order.
use std::io::Read;
use std::path::{Path, PathBuf};

use quick_xml::events::BytesStart;
use quick_xml::reader::Reader;
use tracing::debug;

use crate::error::{CovnormError, Result};
use crate::model::CoverageData;
use crate::report::{Report, ReportBuilder, SourceFile};
use crate::resolve::PathResolver;

pub mod clover;
pub mod cobertura;
pub mod coveragepy;
pub mod excoveralls;
pub mod gcov;
pub mod gocov;
pub mod jacoco;
pub mod lcov;
pub mod lcovjson;
pub mod simplecov;
pub mod xccov;

/// Number of leading bytes inspected by [`Formatter::recognizes`].
pub const SNIFF_LEN: usize = 4096;

/// A coverage input that a formatter has located on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    path: PathBuf,
}

impl Located {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Decoded coverage data, ready to be folded into a report.
#[derive(Debug, Clone)]
pub struct Parsed {
    path: PathBuf,
    data: CoverageData,
}

impl Parsed {
    pub fn new(path: PathBuf, data: CoverageData) -> Self {
        Self { path, data }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &CoverageData {
        &self.data
    }
}

/// Every coverage dialect implements this trait.
pub trait Formatter: Send + Sync {
    /// Registry key, e.g. `"lcov"`.
    fn name(&self) -> &'static str;

    /// Conventional output locations, relative to the search root, best first.
    fn search_paths(&self) -> &'static [&'static str];

    /// Whether `path`, whose first bytes are `head`, is in this dialect.
    fn recognizes(&self, path: &Path, head: &str) -> bool;

    /// Decode raw input bytes into the uniform coverage model.
    fn decode(&self, input: &[u8]) -> anyhow::Result<CoverageData>;

    /// Locate the input. Explicit `candidates` must exist, be readable and be
    /// recognized; otherwise the first existing default location wins.
    fn search(&self, root: &Path, candidates: &[PathBuf]) -> Result<Located> {
        if candidates.is_empty() {
            return search_defaults(self.name(), root, self.search_paths());
        }

        let mut tried = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let path = root.join(candidate);
            if path.is_file() {
                match read_head(&path) {
                    Ok(head) if self.recognizes(&path, &head) => return Ok(Located::new(path)),
                    Ok(_) => {
                        debug!(formatter = self.name(), path = %path.display(), "not recognized")
                    }
                    Err(e) => {
                        debug!(formatter = self.name(), path = %path.display(), "unreadable: {e}")
                    }
                }
            }
            tried.push(path);
        }
        Err(CovnormError::NotFound {
            formatter: self.name().to_string(),
            tried,
        })
    }

    /// Read and decode the located input.
    fn parse(&self, located: &Located) -> Result<Parsed> {
        let content = read_input(self.name(), located.path())?;
        let data = self
            .decode(&content)
            .and_then(|data| data.check_size().map(|()| data))
            .map_err(|e| CovnormError::Parse {
                formatter: self.name().to_string(),
                path: located.path().to_path_buf(),
                source: e.into(),
            })?;
        Ok(Parsed::new(located.path().to_path_buf(), data))
    }

    /// Fold decoded data into a canonical report.
    fn format(&self, parsed: Parsed, resolver: &PathResolver) -> Result<Report> {
        let mut builder = ReportBuilder::new(self.name());
        for file in &parsed.data.files {
            let resolved = resolver.resolve(&file.path);
            builder.add(SourceFile::from_parsed(file, resolved));
        }
        builder.build()
    }
}

/// Ordered, immutable set of formatters. Order is the discovery priority.
pub struct Registry {
    formatters: Vec<Box<dyn Formatter>>,
}

impl Registry {
    pub fn new(formatters: Vec<Box<dyn Formatter>>) -> Self {
        Self { formatters }
    }

    /// All built-in dialects in declared priority order.
    pub fn builtin() -> Self {
        Self::new(vec![
            Box::new(clover::CloverFormatter),
            Box::new(cobertura::CoberturaFormatter),
            Box::new(coveragepy::CoveragePyFormatter),
            Box::new(excoveralls::ExcoverallsFormatter),
            Box::new(gcov::GcovFormatter),
            Box::new(gocov::GocovFormatter),
            Box::new(jacoco::JacocoFormatter),
            Box::new(lcov::LcovFormatter),
            Box::new(lcovjson::LcovJsonFormatter),
            Box::new(simplecov::SimplecovFormatter),
            Box::new(xccov::XccovFormatter),
        ])
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.formatters.iter().map(|f| f.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Formatter> {
        self.formatters.iter().map(|f| f.as_ref())
    }

    pub fn get(&self, name: &str) -> Result<&dyn Formatter> {
        self.iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| CovnormError::UnknownFormatter {
                name: name.to_string(),
                known: self.known(),
            })
    }

    pub(crate) fn known(&self) -> Vec<String> {
        self.names().into_iter().map(str::to_string).collect()
    }
}

/// Probe ranked default locations under `root`; the first existing file wins.
pub fn search_defaults(formatter: &str, root: &Path, locations: &[&str]) -> Result<Located> {
    let mut tried = Vec::with_capacity(locations.len());
    for location in locations {
        let path = root.join(location);
        if path.is_file() {
            return Ok(Located::new(path));
        }
        tried.push(path);
    }
    Err(CovnormError::NotFound {
        formatter: formatter.to_string(),
        tried,
    })
}

/// Read a whole input file, mapping a missing file to `NotFound`.
pub(crate) fn read_input(formatter: &str, path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CovnormError::NotFound {
            formatter: formatter.to_string(),
            tried: vec![path.to_path_buf()],
        },
        _ => CovnormError::Io(e),
    })
}

/// Read at most [`SNIFF_LEN`] bytes of a file as lossy UTF-8.
pub(crate) fn read_head(path: &Path) -> std::io::Result<String> {
    let mut buf = Vec::with_capacity(SNIFF_LEN);
    std::fs::File::open(path)?
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub(crate) fn looks_like_xml(head: &str) -> bool {
    let trimmed = head.trim_start_matches('\u{feff}').trim_start();
    trimmed.starts_with("<?xml") || trimmed.starts_with('<')
}

pub(crate) fn looks_like_json_object(head: &str) -> bool {
    head.trim_start_matches('\u{feff}').trim_start().starts_with('{')
}

pub(crate) fn looks_like_json_array(head: &str) -> bool {
    head.trim_start_matches('\u{feff}').trim_start().starts_with('[')
}

pub(crate) fn xml_reader(input: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);
    reader
}

pub(crate) fn xml_err(e: quick_xml::Error, reader: &Reader<&[u8]>) -> anyhow::Error {
    anyhow::anyhow!(
        "XML parse error at position {}: {}",
        reader.buffer_position(),
        e
    )
}

/// Unescaped value of attribute `name`, if present.
pub(crate) fn get_attr(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Attribute `name` parsed as a number, if present and well-formed.
pub(crate) fn get_num<T: std::str::FromStr>(e: &BytesStart, name: &[u8]) -> Option<T> {
    get_attr(e, name).and_then(|v| v.trim().parse().ok())
}


impl std::fmt::Debug for dyn Formatter + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Formatter").field("name", &self.name()).finish()
    }
}
