//! Case folder layout
//!
//! A case folder looks like this:
//!
//! ```text
//! <case>/
//!   Export 2024-001.csv       <- exactly one report, its stem is the title
//!   media/                    <- exported media plus logo.png
//!   thumbnails/               <- created on demand
//!   Results-formatted.html    <- written by us
//! ```

use crate::error::{ReportError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const MEDIA_DIR: &str = "media";
pub const THUMBNAILS_DIR: &str = "thumbnails";
pub const REPORT_FILE: &str = "Results-formatted.html";
pub const LOGO_FILE: &str = "logo.png";

#[derive(Debug, Clone)]
pub struct CaseLayout {
    pub root: PathBuf,
    pub media_dir: PathBuf,
    pub thumbnails_dir: PathBuf,
    pub csv_path: PathBuf,
    pub report_path: PathBuf,
    /// CSV file stem, used as the report title
    pub title: String,
}

impl CaseLayout {
    /// Resolve the fixed subdirectories and the single CSV under `root`.
    pub fn discover(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ReportError::MissingInput {
                what: "case directory",
                path: root.to_path_buf(),
            });
        }

        let media_dir = root.join(MEDIA_DIR);
        if !media_dir.is_dir() {
            return Err(ReportError::MissingInput {
                what: "media directory",
                path: media_dir,
            });
        }

        let csv_path = find_csv(root)?;
        let title = csv_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            root: root.to_path_buf(),
            media_dir,
            thumbnails_dir: root.join(THUMBNAILS_DIR),
            csv_path,
            report_path: root.join(REPORT_FILE),
            title,
        })
    }
}

fn find_csv(root: &Path) -> Result<PathBuf> {
    let mut candidates = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            ReportError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_csv = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if is_csv {
            candidates.push(entry.into_path());
        }
    }

    match candidates.len() {
        0 => Err(ReportError::MissingCsv { dir: root.to_path_buf() }),
        1 => Ok(candidates.remove(0)),
        _ => Err(ReportError::AmbiguousCsv {
            dir: root.to_path_buf(),
            candidates,
        }),
    }
}
