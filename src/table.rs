//! In-memory store for the exported CSV
//!
//! The export is a flat comma-separated file: one header line, then one
//! record per line. There is no quoting or escaping, so a value containing
//! a comma shifts every column after it. That case is rejected as a
//! [`ReportError::MalformedCsv`] instead of being guessed at.
//!
//! Headers are sanitized to alphanumeric identifiers
//! (`"File Size (Bytes)"` becomes `FileSizeBytes`). Rows are write-once and
//! read back in the order they appeared.

use crate::error::{ReportError, Result};
use std::collections::HashSet;

/// One CSV record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    /// 1-based, in file order
    pub id: u64,
    /// One value per column
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReportTable {
    headers: Vec<String>,
    columns: Vec<String>,
    rows: Vec<ReportRow>,
}

/// Keep only the alphanumeric characters of a header.
pub fn sanitize_column(header: &str) -> String {
    header.chars().filter(|c| c.is_alphanumeric()).collect()
}

impl ReportTable {
    /// Parse CSV text into columns and rows.
    pub fn load(text: &str) -> Result<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut lines = text.lines().enumerate();

        let header_line = loop {
            match lines.next() {
                Some((_, line)) if line.trim().is_empty() => continue,
                Some((_, line)) => break line,
                None => {
                    return Err(ReportError::MalformedCsv {
                        line: 1,
                        message: "missing header line".to_string(),
                    })
                }
            }
        };

        let headers: Vec<String> = header_line.split(',').map(|h| h.trim().to_string()).collect();
        let columns = unique_columns(&headers);

        let mut table = Self {
            headers,
            columns,
            rows: Vec::new(),
        };

        for (idx, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let values: Vec<String> = line.split(',').map(str::to_string).collect();
            if values.len() != table.columns.len() {
                return Err(ReportError::MalformedCsv {
                    line: idx + 1,
                    message: format!(
                        "{} values for {} columns (values containing commas are not supported)",
                        values.len(),
                        table.columns.len()
                    ),
                });
            }
            table.insert(values);
        }

        tracing::debug!(columns = table.columns.len(), rows = table.rows.len(), "loaded CSV");
        Ok(table)
    }

    fn insert(&mut self, values: Vec<String>) {
        let id = self.rows.len() as u64 + 1;
        self.rows.push(ReportRow { id, values });
    }

    /// Headers exactly as they appeared in the file.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Sanitized column identifiers, same order as the headers.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in insertion order (id ascending).
    pub fn scan(&self) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, matched against the sanitized name or the raw
    /// header (case-insensitive either way).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = sanitize_column(name);
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(&wanted))
            .or_else(|| self.headers.iter().position(|h| h.eq_ignore_ascii_case(name.trim())))
    }
}

/// Sanitize every header, naming empty ones by position and suffixing
/// repeats so each identifier is unique.
fn unique_columns(headers: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let base = match sanitize_column(h) {
                s if s.is_empty() => format!("Column{}", i + 1),
                s => s,
            };
            let mut name = base.clone();
            let mut n = 2;
            while !seen.insert(name.to_lowercase()) {
                name = format!("{}{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}
