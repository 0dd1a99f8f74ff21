//! Row rendering: digest matching and cell formatting
//!
//! Each CSV row is matched to a media file through the [`HashIndex`], then
//! every cell is run through [`check_value`]:
//!
//! ```text
//! "1234567"  -> "1,234,567"        all digits: byte count
//! "125.5"    -> "0:02:05.500000"   digits with one '.': seconds
//! "abc"      -> "abc"              anything else, untouched
//! ```
//!
//! The integer check runs first, so a bare integer is never read as a
//! duration. Classification never fails; anything it can't format is
//! passed through.

use crate::error::{ReportError, Result};
use crate::layout::{MEDIA_DIR, THUMBNAILS_DIR};
use crate::media::thumbnail::thumbnail_name;
use crate::media::{DigestKind, HashIndex};
use crate::table::{ReportRow, ReportTable};
use std::path::{Path, PathBuf};

/// Largest day count a duration may carry before it is left as text
const MAX_DAYS: u128 = 999_999_999;
const MICROS_PER_SEC: u128 = 1_000_000;
const MICROS_PER_DAY: u128 = 86_400 * MICROS_PER_SEC;

/// Which column holds the digest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HashColumn {
    /// Try every cell, first against MD5 then against SHA1
    #[default]
    Auto,
    /// A single column, by sanitized or raw header name
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    pub id: u64,
    /// `media/<file>`, or `None` when no file matched
    pub media_link: Option<String>,
    /// Specific frame or the placeholder
    pub thumbnail_link: String,
    pub digest: Option<DigestKind>,
    pub cells: Vec<String>,
}

impl RenderedRow {
    pub fn is_matched(&self) -> bool {
        self.media_link.is_some()
    }
}

pub struct RowRenderer<'a> {
    index: &'a HashIndex,
    thumbnails_dir: PathBuf,
    placeholder_name: String,
    hash_column: Option<usize>,
}

impl<'a> RowRenderer<'a> {
    /// Resolve `hash_column` against the table up front so a bad name fails
    /// before anything is rendered.
    pub fn new(
        index: &'a HashIndex,
        table: &ReportTable,
        hash_column: &HashColumn,
        thumbnails_dir: &Path,
        placeholder_name: &str,
    ) -> Result<Self> {
        let hash_column = match hash_column {
            HashColumn::Auto => None,
            HashColumn::Named(name) => Some(table.column_index(name).ok_or_else(|| {
                ReportError::UnknownHashColumn {
                    name: name.clone(),
                    available: table.columns().to_vec(),
                }
            })?),
        };

        Ok(Self {
            index,
            thumbnails_dir: thumbnails_dir.to_path_buf(),
            placeholder_name: placeholder_name.to_string(),
            hash_column,
        })
    }

    pub fn render(&self, row: &ReportRow) -> RenderedRow {
        let found = self.find_match(row);

        let (media_link, thumbnail_link) = match found {
            Some((_, filename, _)) => {
                let thumb = thumbnail_name(filename);
                let thumbnail_link = if self.thumbnails_dir.join(&thumb).is_file() {
                    link(THUMBNAILS_DIR, &thumb)
                } else {
                    link(THUMBNAILS_DIR, &self.placeholder_name)
                };
                (Some(link(MEDIA_DIR, filename)), thumbnail_link)
            }
            None => (None, link(THUMBNAILS_DIR, &self.placeholder_name)),
        };

        let matched_cell = found.map(|(col, _, _)| col);
        let cells = row
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                if Some(i) == matched_cell {
                    v.clone()
                } else {
                    check_value(v)
                }
            })
            .collect();

        RenderedRow {
            id: row.id,
            media_link,
            thumbnail_link,
            digest: found.map(|(_, _, kind)| kind),
            cells,
        }
    }

    /// (cell index, filename, digest kind) of the first hit.
    fn find_match(&self, row: &ReportRow) -> Option<(usize, &'a str, DigestKind)> {
        if let Some(col) = self.hash_column {
            let value = row.values.get(col)?;
            return self.index.lookup(value).map(|m| (col, m.filename, m.kind));
        }

        for kind in [DigestKind::Md5, DigestKind::Sha1] {
            for (col, value) in row.values.iter().enumerate() {
                if let Some(m) = self.index.lookup_kind(kind, value) {
                    return Some((col, m.filename, m.kind));
                }
            }
        }
        None
    }
}

/// `dir/<percent-encoded name>`
fn link(dir: &str, filename: &str) -> String {
    format!("{}/{}", dir, urlencoding::encode(filename))
}

/// Format a CSV cell for display.
pub fn check_value(value: &str) -> String {
    if is_digits(value) {
        return group_thousands(value);
    }
    if is_decimal(value) {
        if let Some(d) = value.parse::<f64>().ok().and_then(format_duration) {
            return d;
        }
    }
    value.to_string()
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Digits with exactly one '.', and at least one digit.
fn is_decimal(s: &str) -> bool {
    s.bytes().filter(|&b| b == b'.').count() == 1 && is_digits(&s.replacen('.', "", 1))
}

/// "0001234567" -> "1,234,567". Works on the text so length is unbounded.
fn group_thousands(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    let digits = if trimmed.is_empty() { "0" } else { trimmed };

    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Seconds as `H:MM:SS[.ffffff]`, with a `N day(s), ` prefix past 24 hours.
///
/// Rounded to the nearest microsecond. `None` for negative, non-finite or
/// absurdly large values.
pub fn format_duration(seconds: f64) -> Option<String> {
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let micros = (seconds * MICROS_PER_SEC as f64).round_ties_even();
    if micros >= ((MAX_DAYS + 1) * MICROS_PER_DAY) as f64 {
        return None;
    }
    let micros = micros as u128;

    let days = micros / MICROS_PER_DAY;
    let rem = micros % MICROS_PER_DAY;
    let secs = rem / MICROS_PER_SEC;
    let frac = rem % MICROS_PER_SEC;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{} day{}, ", days, if days == 1 { "" } else { "s" }));
    }
    out.push_str(&format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60));
    if frac > 0 {
        out.push_str(&format!(".{:06}", frac));
    }
    Some(out)
}
