use std::path::PathBuf;

use thiserror::Error;

/// Boxed decode failure carried by [`CovnormError::Parse`].
pub type DecodeError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum CovnormError {
    #[error("{formatter}: no coverage file found (tried: {})", display_paths(.tried))]
    NotFound {
        formatter: String,
        tried: Vec<PathBuf>,
    },

    #[error("could not find any viable formatter. available formatters: {}", .known.join(", "))]
    NoFormatterFound { known: Vec<String> },

    #[error("could not find a formatter of type '{name}'. available formatters: {}", .known.join(", "))]
    UnknownFormatter { name: String, known: Vec<String> },

    #[error("{formatter}: failed to parse {}", .path.display())]
    Parse {
        formatter: String,
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error("{formatter}: could not find coverage info for source files")]
    EmptyReport { formatter: String },

    #[error("failed to write report to {sink}")]
    Write {
        sink: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CovnormError>;

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "<none>".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
