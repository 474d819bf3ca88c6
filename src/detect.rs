/// Formatter selection.
///
/// Strategy:
///   1. An explicitly named formatter is looked up in the registry and
///      searched with the caller's candidate paths.
///   2. Otherwise every formatter is probed, in registry order, against its
///      own default locations. The first successful search wins and later
///      formatters are never probed.
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{CovnormError, Result};
use crate::formatters::{Formatter, Located, Registry};

/// Probe every registered formatter's default locations under `root`.
pub fn discover<'r>(registry: &'r Registry, root: &Path) -> Result<(&'r dyn Formatter, Located)> {
    for formatter in registry.iter() {
        match formatter.search(root, &[]) {
            Ok(located) => {
                info!(
                    formatter = formatter.name(),
                    path = %located.path().display(),
                    "discovered coverage input"
                );
                return Ok((formatter, located));
            }
            Err(e) => debug!(formatter = formatter.name(), "probe failed: {e}"),
        }
    }
    Err(CovnormError::NoFormatterFound {
        known: registry.known(),
    })
}

/// Use the formatter called `name`, searching `candidates` (or its defaults).
pub fn select<'r>(
    registry: &'r Registry,
    name: &str,
    root: &Path,
    candidates: &[PathBuf],
) -> Result<(&'r dyn Formatter, Located)> {
    let formatter = registry.get(name)?;
    let located = formatter.search(root, candidates)?;
    debug!(
        formatter = formatter.name(),
        path = %located.path().display(),
        "selected coverage input"
    );
    Ok((formatter, located))
}
