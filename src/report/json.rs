//! JSON manifest of a run, for scripting against the reconciliation result

use crate::error::Result;
use crate::media::DigestKind;
use crate::pipeline::{Reconciliation, RunSummary};
use crate::report::ReportMetadata;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Serialize)]
struct Manifest<'a> {
    generated: &'a str,
    title: &'a str,
    case_number: &'a str,
    item_number: &'a str,
    analyst: &'a str,
    summary: &'a RunSummary,
    columns: &'a [String],
    rows: Vec<ManifestRow<'a>>,
}

#[derive(Serialize)]
struct ManifestRow<'a> {
    id: u64,
    media: Option<&'a str>,
    thumbnail: &'a str,
    digest: Option<DigestKind>,
}

pub fn to_string(metadata: &ReportMetadata, run: &Reconciliation) -> Result<String> {
    Ok(serde_json::to_string_pretty(&manifest(metadata, run))?)
}

/// Write the manifest to `path` atomically.
pub fn generate<P: AsRef<Path>>(path: P, metadata: &ReportMetadata, run: &Reconciliation) -> Result<()> {
    let body = to_string(metadata, run)?;
    super::write_atomic(path.as_ref(), |w| {
        w.write_all(body.as_bytes())?;
        w.write_all(b"\n")
    })
}

fn manifest<'a>(metadata: &'a ReportMetadata, run: &'a Reconciliation) -> Manifest<'a> {
    Manifest {
        generated: &metadata.generated,
        title: &metadata.title,
        case_number: &metadata.case_number,
        item_number: &metadata.item_number,
        analyst: &metadata.analyst,
        summary: &run.summary,
        columns: &run.columns,
        rows: run
            .rows
            .iter()
            .map(|r| ManifestRow {
                id: r.id,
                media: r.media_link.as_deref(),
                thumbnail: &r.thumbnail_link,
                digest: r.digest,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::render::RenderedRow;

    fn run() -> Reconciliation {
        Reconciliation {
            summary: RunSummary {
                media_files: 1,
                rows: 2,
                matched_rows: 1,
                unmatched_rows: 1,
                ..RunSummary::default()
            },
            columns: vec!["Hash".to_string()],
            rows: vec![
                RenderedRow {
                    id: 1,
                    media_link: Some("media/a.mp4".to_string()),
                    thumbnail_link: "thumbnails/a.mp4.jpg".to_string(),
                    digest: Some(DigestKind::Md5),
                    cells: vec!["AA".to_string()],
                },
                RenderedRow {
                    id: 2,
                    media_link: None,
                    thumbnail_link: "thumbnails/generic_thumb.svg".to_string(),
                    digest: None,
                    cells: vec!["FF".to_string()],
                },
            ],
        }
    }

    #[test]
    fn test_manifest_shape() {
        let meta = ReportMetadata {
            title: "Export".to_string(),
            generated: "2024-05-01 10:00:00".to_string(),
            ..ReportMetadata::default()
        };
        let json = to_string(&meta, &run()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["title"], "Export");
        assert_eq!(value["summary"]["matched_rows"], 1);
        assert_eq!(value["rows"][0]["media"], "media/a.mp4");
        assert_eq!(value["rows"][0]["digest"], "md5");
        assert!(value["rows"][1]["media"].is_null());
        assert_eq!(value["rows"][1]["thumbnail"], "thumbnails/generic_thumb.svg");
    }

    #[test]
    fn test_generate_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        generate(&path, &ReportMetadata::default(), &run()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.trim_start().starts_with('{'));
        assert!(text.ends_with("}\n"));
    }
}
