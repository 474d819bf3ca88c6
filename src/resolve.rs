//! Maps raw paths emitted by coverage tools to repository-relative names.
//!
//! Resolution runs in a fixed order:
//!   1. normalize separators to `/` and strip the configured prefix
//!   2. prepend the configured add-prefix
//!   3. optionally look up a version-control blob id for the final name
//!
//! Blob lookup is best-effort: any failure leaves the blob empty and is only
//! logged. Paths with `..` segments are passed through as-is.
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Looks up an immutable content identifier for a repository-relative path.
pub trait BlobResolver: Send + Sync {
    fn blob_id(&self, name: &str) -> Result<String>;
}

impl<F> BlobResolver for F
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn blob_id(&self, name: &str) -> Result<String> {
        self(name)
    }
}

/// Blob ids from `git hash-object`.
///
/// Names are looked up relative to the top level of the repository that
/// contains `work_dir`, falling back to `work_dir` itself when the name does
/// not exist there (or `work_dir` is not inside a repository).
pub struct GitBlobResolver {
    work_dir: PathBuf,
    toplevel: OnceLock<Option<PathBuf>>,
}

impl GitBlobResolver {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            toplevel: OnceLock::new(),
        }
    }

    fn toplevel(&self) -> Option<&Path> {
        self.toplevel
            .get_or_init(|| match git(&self.work_dir, ["rev-parse", "--show-toplevel"]) {
                Ok(top) => Some(PathBuf::from(top)),
                Err(e) => {
                    debug!("no git top level for {}: {e:#}", self.work_dir.display());
                    None
                }
            })
            .as_deref()
    }
}

impl BlobResolver for GitBlobResolver {
    fn blob_id(&self, name: &str) -> Result<String> {
        let path = self
            .toplevel()
            .map(|top| top.join(name))
            .filter(|p| p.is_file())
            .unwrap_or_else(|| self.work_dir.join(name));

        let id = git(
            &self.work_dir,
            [OsStr::new("hash-object"), OsStr::new("--"), path.as_os_str()],
        )?;
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_hexdigit()) {
            anyhow::bail!("unexpected git hash-object output: {id:?}");
        }
        Ok(id)
    }
}

/// Run git in `dir` and return its trimmed stdout.
fn git<I, S>(dir: &Path, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<S> = args.into_iter().collect();
    let subcommand = args
        .first()
        .map(|a| a.as_ref().to_string_lossy().into_owned())
        .unwrap_or_default();
    let output = Command::new("git")
        .args(&args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("Failed to run git {subcommand}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("git {subcommand} failed: {}", stderr.trim());
    }

    Ok(String::from_utf8(output.stdout)
        .with_context(|| format!("git {subcommand} output not valid UTF-8"))?
        .trim()
        .to_string())
}

/// Result of resolving one raw path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub name: String,
    pub blob_id: Option<String>,
}

/// Path resolution rules, fixed at construction.
#[derive(Default)]
pub struct PathResolver {
    prefix: Option<String>,
    add_prefix: Option<String>,
    blobs: Option<Box<dyn BlobResolver>>,
}

impl PathResolver {
    /// `prefix` is the directory the analysis ran in; `add_prefix` is joined
    /// in front of every stripped path. Empty values are ignored.
    pub fn new(prefix: Option<&Path>, add_prefix: Option<&str>) -> Self {
        let prefix = prefix
            .map(|p| normalize_separators(&p.to_string_lossy()))
            .filter(|p| !p.is_empty());
        let add_prefix = add_prefix
            .map(|p| normalize_separators(p).trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty());
        Self {
            prefix,
            add_prefix,
            blobs: None,
        }
    }

    pub fn with_blob_resolver(mut self, blobs: Box<dyn BlobResolver>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    /// Apply prefix stripping and the add-prefix, without blob lookup.
    pub fn name(&self, raw: &str) -> String {
        let stripped = self.strip(raw);
        match &self.add_prefix {
            Some(add) => format!("{}/{}", add, stripped.trim_start_matches('/')),
            None => stripped,
        }
    }

    /// Resolve a raw path to its canonical name and, if configured, blob id.
    pub fn resolve(&self, raw: &str) -> ResolvedPath {
        let name = self.name(raw);
        let blob_id = self.blobs.as_ref().and_then(|blobs| match blobs.blob_id(&name) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("could not resolve blob for {name}: {e:#}");
                None
            }
        });
        debug!(raw, %name, "resolved path");
        ResolvedPath { name, blob_id }
    }

    /// Normalize separators and strip the prefix on a component boundary.
    /// Idempotent once the prefix no longer matches.
    pub fn strip(&self, raw: &str) -> String {
        let path = normalize_separators(raw);
        let Some(prefix) = &self.prefix else {
            return path;
        };
        let base = prefix.trim_end_matches('/');
        match path.strip_prefix(base) {
            Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/').to_string(),
            _ => path,
        }
    }
}

fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}
