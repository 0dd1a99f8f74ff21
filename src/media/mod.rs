//! Media discovery
//!
//! Lists the regular files directly inside `media/`, hashes each one and
//! hands back [`MediaFile`] records in filename order. Files that cannot be
//! read are skipped and reported rather than aborting the run.
//!
//! - [`hash`]: streaming MD5/SHA1 and the digest lookup tables
//! - [`thumbnail`]: frame extraction through an external tool

pub mod hash;
pub mod thumbnail;

use crate::error::{ReportError, Result};
use crate::progress;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub use hash::{DigestCollision, DigestKind, DigestMatch, DuplicatePolicy, FileDigests, HashIndex};

/// A file in the media directory with both of its digests.
#[derive(Debug, Clone, Serialize)]
pub struct MediaFile {
    pub path: PathBuf,
    pub filename: String,
    pub size: u64,
    /// Uppercase hex
    pub md5: String,
    /// Uppercase hex
    pub sha1: String,
}

/// A media file that could not be hashed.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct MediaScan {
    pub files: Vec<MediaFile>,
    pub skipped: Vec<SkippedFile>,
}

/// Paths found in the media directory, plus entries that couldn't be read.
#[derive(Debug, Default)]
pub struct MediaListing {
    pub files: Vec<PathBuf>,
    pub skipped: Vec<SkippedFile>,
}

/// List regular files directly inside `dir`, sorted by name.
///
/// Symlinks are followed so a linked file counts as a regular file.
/// Subdirectories are ignored. A dangling link lands in `skipped`.
pub fn list_files(dir: &Path) -> Result<MediaListing> {
    let mut listing = MediaListing::default();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        match entry {
            Ok(entry) if entry.file_type().is_file() => listing.files.push(entry.into_path()),
            Ok(_) => {}
            // An error on the directory itself is fatal, a broken entry is not
            Err(e) if e.depth() == 0 => {
                let path = e.path().unwrap_or(dir).to_path_buf();
                return Err(ReportError::io(path, e.into()));
            }
            Err(e) => {
                let path = e.path().unwrap_or(dir).to_path_buf();
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable directory entry");
                listing.skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(listing)
}

/// Hash every file in `dir` in parallel.
pub fn scan_media(dir: &Path, show_progress: bool) -> Result<MediaScan> {
    let listing = list_files(dir)?;
    tracing::info!(count = listing.files.len(), dir = %dir.display(), "hashing media files");

    let pb = progress::bar(listing.files.len(), "hashing", show_progress);

    let digests: Vec<(PathBuf, std::io::Result<FileDigests>)> = listing
        .files
        .into_par_iter()
        .map(|path| {
            let result = hash::digest_file(&path);
            pb.inc(1);
            if let Some(name) = path.file_name() {
                pb.set_message(name.to_string_lossy().into_owned());
            }
            (path, result)
        })
        .collect();

    pb.finish_and_clear();

    let mut scan = merge(digests);
    let mut skipped = listing.skipped;
    skipped.append(&mut scan.skipped);
    scan.skipped = skipped;
    Ok(scan)
}

/// Fold hashing results into a scan, keeping input order.
fn merge(digests: Vec<(PathBuf, std::io::Result<FileDigests>)>) -> MediaScan {
    let mut scan = MediaScan::default();
    for (path, result) in digests {
        match result {
            Ok(d) => {
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                tracing::debug!(file = %filename, md5 = %d.md5, sha1 = %d.sha1, "hashed");
                scan.files.push(MediaFile {
                    path,
                    filename,
                    size: d.size,
                    md5: d.md5,
                    sha1: d.sha1,
                });
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable media file");
                scan.skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }
    scan
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_list_files_is_flat_and_sorted() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.mp4"), b"b").unwrap();
        fs::write(dir.path().join("a.mp4"), b"a").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.mp4"), b"c").unwrap();

        let listing = list_files(dir.path()).unwrap();
        assert!(listing.skipped.is_empty());
        let names: Vec<_> = listing
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a.mp4", "b.mp4"]);
    }

    #[test]
    fn test_list_files_missing_dir_is_error() {
        let dir = tempdir().unwrap();
        let err = list_files(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, ReportError::Io { .. }));
    }

    #[test]
    fn test_scan_media_hashes_each_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("empty.bin"), b"").unwrap();
        fs::write(dir.path().join("abc.txt"), b"abc").unwrap();

        let scan = scan_media(dir.path(), false).unwrap();

        assert!(scan.skipped.is_empty());
        assert_eq!(scan.files.len(), 2);
        let abc = &scan.files[0];
        assert_eq!(abc.filename, "abc.txt");
        assert_eq!(abc.size, 3);
        assert_eq!(abc.md5, "900150983CD24FB0D6963F7D28E17F72");
        assert_eq!(abc.sha1, "A9993E364706816ABA3E25717850C26C9CD0D89D");
        let empty = &scan.files[1];
        assert_eq!(empty.md5, "D41D8CD98F00B204E9800998ECF8427E");
    }

    #[test]
    fn test_merge_records_unreadable_file() {
        let digests = vec![
            (
                PathBuf::from("media/a.mp4"),
                Ok(FileDigests {
                    md5: "AA".to_string(),
                    sha1: "BB".to_string(),
                    size: 2,
                }),
            ),
            (
                PathBuf::from("media/locked.mp4"),
                Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied")),
            ),
        ];

        let scan = merge(digests);

        assert_eq!(scan.files.len(), 1);
        assert_eq!(scan.files[0].filename, "a.mp4");
        assert_eq!(scan.skipped.len(), 1);
        assert_eq!(scan.skipped[0].path, PathBuf::from("media/locked.mp4"));
        assert!(scan.skipped[0].reason.contains("denied"));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_skipped_not_dropped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.mp4"), b"a").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.mp4"), dir.path().join("link.mp4")).unwrap();

        let scan = scan_media(dir.path(), false).unwrap();

        assert_eq!(scan.files.len(), 1);
        assert_eq!(scan.skipped.len(), 1);
        assert_eq!(scan.skipped[0].path, dir.path().join("link.mp4"));
    }
}
