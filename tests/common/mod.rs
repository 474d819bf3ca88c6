#![allow(dead_code)]

use std::path::{Path, PathBuf};

use covnorm::report::Report;
use covnorm::resolve::PathResolver;
use tempfile::TempDir;

/// Create a fresh search root. The caller must hold onto `TempDir` to keep
/// the directory alive.
pub fn setup_root() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Write `content` to `rel` under `root`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &[u8]) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// Resolver that strips `prefix` and never looks up blobs.
pub fn resolver(prefix: &str) -> PathResolver {
    PathResolver::new(Some(Path::new(prefix)), None)
}

/// File names of a report, in order.
pub fn names(report: &Report) -> Vec<&str> {
    report.source_files().iter().map(|f| f.name()).collect()
}
