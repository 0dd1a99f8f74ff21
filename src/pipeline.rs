//! End-to-end reconciliation run
//!
//! Stages run one after the other:
//!
//! 1. hash everything in `media/` (parallel, merged into a [`HashIndex`])
//! 2. extract thumbnails (parallel, best effort)
//! 3. load the CSV
//! 4. render every row against the index
//! 5. write `Results-formatted.html`

use crate::error::{ReportError, Result};
use crate::layout::CaseLayout;
use crate::media::thumbnail::{self, FfmpegExtractor, FrameExtractor, Placeholder, ThumbnailFailure};
use crate::media::{self, DigestCollision, DuplicatePolicy, HashIndex, SkippedFile};
use crate::report::render::{HashColumn, RenderedRow, RowRenderer};
use crate::report::{self, ReportMetadata};
use crate::table::ReportTable;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// What happened during a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub media_files: usize,
    pub skipped_files: Vec<SkippedFile>,
    pub collisions: Vec<DigestCollision>,
    pub thumbnails_generated: usize,
    pub thumbnail_failures: Vec<ThumbnailFailure>,
    pub rows: usize,
    pub matched_rows: usize,
    pub unmatched_rows: usize,
    pub report_path: PathBuf,
}

/// Summary plus the rendered rows, for callers that want more than the HTML.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub summary: RunSummary,
    pub columns: Vec<String>,
    pub rows: Vec<RenderedRow>,
}

pub struct Reconciler {
    duplicate_policy: DuplicatePolicy,
    hash_column: HashColumn,
    extractor: Box<dyn FrameExtractor>,
    skip_thumbnails: bool,
    placeholder: Placeholder,
    show_progress: bool,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::default(),
            hash_column: HashColumn::default(),
            extractor: Box::new(FfmpegExtractor::new()),
            skip_thumbnails: false,
            placeholder: Placeholder::default(),
            show_progress: false,
        }
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_hash_column(mut self, column: HashColumn) -> Self {
        self.hash_column = column;
        self
    }

    pub fn with_extractor(mut self, extractor: impl FrameExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    pub fn with_skip_thumbnails(mut self, skip: bool) -> Self {
        self.skip_thumbnails = skip;
        self
    }

    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn run(&self, layout: &CaseLayout, metadata: &ReportMetadata) -> Result<Reconciliation> {
        // Stage 1: hash
        let scan = media::scan_media(&layout.media_dir, self.show_progress)?;
        let index = HashIndex::build(&scan.files, self.duplicate_policy);
        tracing::info!(
            files = scan.files.len(),
            skipped = scan.skipped.len(),
            collisions = index.collisions().len(),
            "media indexed"
        );

        // Stage 2: thumbnails
        let extractor = (!self.skip_thumbnails).then_some(self.extractor.as_ref());
        let thumbs = thumbnail::generate_thumbnails(
            &scan.files,
            &layout.thumbnails_dir,
            extractor,
            &self.placeholder,
            self.show_progress,
        )?;

        // Stage 3: CSV
        let text = fs::read_to_string(&layout.csv_path).map_err(|e| ReportError::io(&layout.csv_path, e))?;
        let table = ReportTable::load(&text)?;

        // Stage 4: render
        let renderer = RowRenderer::new(
            &index,
            &table,
            &self.hash_column,
            &layout.thumbnails_dir,
            &self.placeholder.file_name(),
        )?;
        let rows: Vec<RenderedRow> = table.scan().map(|row| renderer.render(row)).collect();
        let matched = rows.iter().filter(|r| r.is_matched()).count();
        tracing::info!(rows = rows.len(), matched, "rows rendered");

        // Stage 5: write
        report::generate(&layout.report_path, metadata, table.columns(), &rows)?;
        tracing::info!(path = %layout.report_path.display(), "report written");

        let summary = RunSummary {
            media_files: scan.files.len(),
            skipped_files: scan.skipped,
            collisions: index.collisions().to_vec(),
            thumbnails_generated: thumbs.generated,
            thumbnail_failures: thumbs.failed,
            rows: rows.len(),
            matched_rows: matched,
            unmatched_rows: rows.len() - matched,
            report_path: layout.report_path.clone(),
        };

        Ok(Reconciliation {
            summary,
            columns: table.columns().to_vec(),
            rows,
        })
    }
}
