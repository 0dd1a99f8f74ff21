//! Error types for a reconciliation run
//!
//! Only failures that stop the whole run live here. Per-file problems
//! (an unreadable media file, a frame extraction that fails) are recorded
//! in the [`RunSummary`](crate::RunSummary) instead.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{what} not found: {}", path.display())]
    MissingInput { what: &'static str, path: PathBuf },

    #[error("no .csv report found in {}", dir.display())]
    MissingCsv { dir: PathBuf },

    #[error("expected exactly one .csv report in {}, found {}: {}", dir.display(), candidates.len(), join_names(candidates))]
    AmbiguousCsv { dir: PathBuf, candidates: Vec<PathBuf> },

    #[error("malformed CSV at line {line}: {message}")]
    MalformedCsv { line: usize, message: String },

    #[error("hash column '{name}' is not in the CSV header (columns: {})", available.join(", "))]
    UnknownHashColumn { name: String, available: Vec<String> },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ReportError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

fn join_names(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string())
        })
        .collect::<Vec<_>>()
        .join(", ")
}
