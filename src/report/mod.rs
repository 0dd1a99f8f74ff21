//! Report output
//!
//! - [`render`]: matches rows to media and formats cells
//! - [`html`]: the `Results-formatted.html` document
//! - [`json`]: optional machine-readable manifest of the same run
//!
//! Both files are written to a temporary sibling first and renamed into
//! place, so an interrupted run never leaves a half-written report over the
//! previous one.

pub mod html;
pub mod json;
pub mod render;

use crate::error::{ReportError, Result};
use render::RenderedRow;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Case details shown at the top of the report.
#[derive(Debug, Clone, Default)]
pub struct ReportMetadata {
    pub title: String,
    pub analyst: String,
    pub case_number: String,
    pub item_number: String,
    /// Shown in the footer
    pub generated: String,
}

impl ReportMetadata {
    pub fn new(title: impl Into<String>, analyst: impl Into<String>, case_number: impl Into<String>, item_number: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            analyst: analyst.into(),
            case_number: case_number.into(),
            item_number: item_number.into(),
            generated: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Write the HTML report to `path` atomically.
pub fn generate<P: AsRef<Path>>(path: P, metadata: &ReportMetadata, columns: &[String], rows: &[RenderedRow]) -> Result<()> {
    write_atomic(path.as_ref(), |w| html::write(w, metadata, columns, rows))
}

/// Run `fill` against a temporary file next to `path`, then rename it over
/// `path`. On failure the temporary file is removed and `path` is untouched.
pub fn write_atomic<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let result: std::io::Result<()> = (|| {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        fill(&mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(ReportError::io(path, e));
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        ReportError::io(path, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tempfile::tempdir;

    #[test]
    fn test_write_atomic_replaces_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Results-formatted.html");
        fs::write(&path, "old").unwrap();

        write_atomic(&path, |w| w.write_all(b"new")).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert!(!dir.path().join(".Results-formatted.html.tmp").exists());
    }

    #[test]
    fn test_write_atomic_failure_keeps_previous() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Results-formatted.html");
        fs::write(&path, "previous run").unwrap();

        let err = write_atomic(&path, |w| {
            w.write_all(b"partial")?;
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        })
        .unwrap_err();

        assert!(matches!(err, ReportError::Io { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous run");
        assert!(!dir.path().join(".Results-formatted.html.tmp").exists());
    }

    #[test]
    fn test_generate_writes_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Results-formatted.html");
        let meta = ReportMetadata::new("T", "A", "C", "I");

        generate(&path, &meta, &["Hash".to_string()], &[]).unwrap();

        let html = fs::read_to_string(&path).unwrap();
        assert!(html.contains("<th>Hash</th>"));
        assert!(html.ends_with("</html>\n"));
    }

    #[test]
    fn test_metadata_new_stamps_generation_time() {
        let meta = ReportMetadata::new("T", "A", "C", "I");
        assert_eq!(meta.generated.len(), "2024-05-01 10:00:00".len());
    }
}
