//! Content hashing and digest lookup
//!
//! Every media file is read once in fixed-size chunks, feeding both an MD5
//! and a SHA1 hasher, so memory stays flat for multi-gigabyte videos.
//!
//! # Duplicate digests
//!
//! Two exported files with identical bytes share a digest, so a CSV row can
//! only ever point at one of them. What happens is decided by
//! [`DuplicatePolicy`]:
//!
//! | Policy      | Table keeps            | Lookup returns |
//! |-------------|------------------------|----------------|
//! | `KeepLast`  | last file in name order | that file     |
//! | `KeepFirst` | first file in name order | that file    |
//! | `Flag`      | first file             | nothing        |
//!
//! Every collision is recorded either way, so the run summary can show it.

use super::MediaFile;
use serde::Serialize;
use sha1::{Digest, Sha1};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

pub const CHUNK_SIZE: usize = 8192;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigests {
    /// Uppercase hex
    pub md5: String,
    /// Uppercase hex
    pub sha1: String,
    pub size: u64,
}

/// Stream `reader` to the end, computing MD5 and SHA1 in one pass.
pub fn digest_reader<R: Read>(mut reader: R) -> io::Result<FileDigests> {
    let mut md5 = md5::Context::new();
    let mut sha1 = Sha1::new();
    let mut buf = [0u8; CHUNK_SIZE];
    let mut size = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        md5.consume(&buf[..n]);
        sha1.update(&buf[..n]);
        size += n as u64;
    }

    Ok(FileDigests {
        md5: format!("{:X}", md5.compute()),
        sha1: hex::encode_upper(sha1.finalize()),
        size,
    })
}

pub fn digest_file(path: &Path) -> io::Result<FileDigests> {
    digest_reader(File::open(path)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestKind {
    Md5,
    Sha1,
}

impl fmt::Display for DigestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestKind::Md5 => write!(f, "MD5"),
            DigestKind::Sha1 => write!(f, "SHA1"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    #[default]
    KeepLast,
    KeepFirst,
    Flag,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keep-last" | "last" => Ok(Self::KeepLast),
            "keep-first" | "first" => Ok(Self::KeepFirst),
            "flag" => Ok(Self::Flag),
            other => Err(format!(
                "unknown duplicate policy '{}' (expected keep-last, keep-first or flag)",
                other
            )),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::KeepLast => "keep-last",
            Self::KeepFirst => "keep-first",
            Self::Flag => "flag",
        };
        f.write_str(s)
    }
}

/// Two media files with the same digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestCollision {
    pub kind: DigestKind,
    pub digest: String,
    /// File already registered for the digest
    pub existing: String,
    /// File that arrived later with the same digest
    pub incoming: String,
}

/// A successful lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestMatch<'a> {
    pub filename: &'a str,
    pub kind: DigestKind,
}

/// Digest-to-filename tables, built once and read-only afterwards.
#[derive(Debug, Default)]
pub struct HashIndex {
    policy: DuplicatePolicy,
    md5: HashMap<String, String>,
    sha1: HashMap<String, String>,
    ambiguous: HashSet<(DigestKind, String)>,
    collisions: Vec<DigestCollision>,
}

impl HashIndex {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Build from files in the order given (callers pass filename order).
    pub fn build<'a>(files: impl IntoIterator<Item = &'a MediaFile>, policy: DuplicatePolicy) -> Self {
        let mut index = Self::new(policy);
        for file in files {
            index.insert(file);
        }
        index
    }

    pub fn insert(&mut self, file: &MediaFile) {
        self.register(DigestKind::Md5, &file.md5, &file.filename);
        self.register(DigestKind::Sha1, &file.sha1, &file.filename);
    }

    fn register(&mut self, kind: DigestKind, digest: &str, filename: &str) {
        let digest = digest.to_ascii_uppercase();
        let table = match kind {
            DigestKind::Md5 => &mut self.md5,
            DigestKind::Sha1 => &mut self.sha1,
        };

        let Some(existing) = table.get(&digest).cloned() else {
            table.insert(digest, filename.to_string());
            return;
        };

        tracing::warn!(
            %kind,
            digest = %digest,
            existing = %existing,
            incoming = %filename,
            policy = %self.policy,
            "duplicate digest in media directory"
        );

        match self.policy {
            DuplicatePolicy::KeepLast => {
                table.insert(digest.clone(), filename.to_string());
            }
            DuplicatePolicy::KeepFirst => {}
            DuplicatePolicy::Flag => {
                self.ambiguous.insert((kind, digest.clone()));
            }
        }

        self.collisions.push(DigestCollision {
            kind,
            digest,
            existing,
            incoming: filename.to_string(),
        });
    }

    fn get(&self, kind: DigestKind, digest: &str) -> Option<&str> {
        let table = match kind {
            DigestKind::Md5 => &self.md5,
            DigestKind::Sha1 => &self.sha1,
        };
        let filename = table.get(digest)?;
        if self.ambiguous.contains(&(kind, digest.to_string())) {
            return None;
        }
        Some(filename.as_str())
    }

    /// Exact lookup of an uppercase MD5 digest.
    pub fn lookup_md5(&self, digest: &str) -> Option<&str> {
        self.get(DigestKind::Md5, digest)
    }

    /// Exact lookup of an uppercase SHA1 digest.
    pub fn lookup_sha1(&self, digest: &str) -> Option<&str> {
        self.get(DigestKind::Sha1, digest)
    }

    /// Look up a CSV cell: trimmed, uppercased, MD5 table first.
    pub fn lookup(&self, value: &str) -> Option<DigestMatch<'_>> {
        let key = value.trim().to_ascii_uppercase();
        if key.is_empty() {
            return None;
        }
        self.lookup_kind(DigestKind::Md5, &key)
            .or_else(|| self.lookup_kind(DigestKind::Sha1, &key))
    }

    /// Look up a CSV cell against one table only.
    pub fn lookup_kind(&self, kind: DigestKind, value: &str) -> Option<DigestMatch<'_>> {
        let key = value.trim().to_ascii_uppercase();
        self.get(kind, &key).map(|filename| DigestMatch { filename, kind })
    }

    pub fn md5_len(&self) -> usize {
        self.md5.len()
    }

    pub fn sha1_len(&self) -> usize {
        self.sha1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.md5.is_empty() && self.sha1.is_empty()
    }

    pub fn collisions(&self) -> &[DigestCollision] {
        &self.collisions
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }
}
