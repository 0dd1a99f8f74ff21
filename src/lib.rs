//! Casereport - Link a forensic CSV export to its media files
//!
//! Forensic tools export a case as a CSV of records plus a folder of the
//! files those records describe. The CSV identifies each file only by its
//! MD5 or SHA1 digest. Casereport hashes every exported file, matches the
//! digests back to the CSV rows and writes a single browsable HTML page
//! with a thumbnail and a link per row.
//!
//! # Case Layout
//!
//! ```text
//! <case>/
//! ├── media/                  exported files (and optionally logo.png)
//! ├── thumbnails/             created, one <file>.jpg per video
//! ├── <anything>.csv          exactly one export
//! └── Results-formatted.html  written
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use casereport::{CaseLayout, Reconciler, ReportMetadata};
//!
//! let layout = CaseLayout::discover("case-24-0815")?;
//! let metadata = ReportMetadata::new(&layout.title, "J. Doe", "24-0815", "3");
//!
//! let run = Reconciler::new().run(&layout, &metadata)?;
//!
//! println!("{} of {} rows matched", run.summary.matched_rows, run.summary.rows);
//! for collision in &run.summary.collisions {
//!     println!("duplicate {}: {} / {}", collision.digest, collision.existing, collision.incoming);
//! }
//! # Ok::<(), casereport::ReportError>(())
//! ```
//!
//! # Value Formatting
//!
//! | Cell | Shown as |
//! |------|----------|
//! | `1234567` | `1,234,567` |
//! | `125.5` | `0:02:05.500000` (seconds as a duration) |
//! | anything else | unchanged |
//!
//! The cell that matched a digest is never reformatted.
//!
//! # Modules
//!
//! - [`layout`]: finds `media/`, `thumbnails/` and the CSV
//! - [`media`]: hashing, the digest index and thumbnail extraction
//! - [`table`]: CSV loading and header sanitizing
//! - [`report`]: row rendering, HTML and JSON output
//! - [`pipeline`]: the end-to-end run

pub mod error;
pub mod layout;
pub mod media;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod table;

pub use error::{ReportError, Result};
pub use layout::CaseLayout;
pub use media::thumbnail::{FfmpegExtractor, FrameExtractor, Placeholder};
pub use media::{DigestKind, DuplicatePolicy, HashIndex};
pub use pipeline::{Reconciler, Reconciliation, RunSummary};
pub use report::render::{check_value, HashColumn};
pub use report::ReportMetadata;
pub use table::{sanitize_column, ReportTable};
