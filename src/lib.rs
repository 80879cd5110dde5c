//! # inkmerge
//!
//! Reconciles a reMarkable tablet's exported document tree with the PDFs the
//! annotations were made on: decodes the binary per-page ink blobs, maps
//! device coordinates onto each PDF page, and emits annotated PDFs plus a
//! consolidated Markdown file of highlighted text per document.
//!
//! ## Quick Start
//!
//! ```no_run
//! use inkmerge::{run, RunOptions};
//!
//! fn main() -> inkmerge::Result<()> {
//!     let options = RunOptions::default();
//!     let summary = run("xochitl-backup/", "out/", &options)?;
//!     println!("{} documents processed", summary.documents_processed);
//!     Ok(())
//! }
//! ```
//!
//! ## Outputs
//!
//! - **Combined PDF**: the source document with ink and highlights drawn in
//! - **Annotated-only PDF**: the same, restricted to pages carrying marks
//! - **Highlights Markdown**: one file per document, Obsidian-ready
//! - **Per-page artifacts**: `pdf`, `png`, `svg`, or `md` per annotated page

pub mod compose;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod highlights;
pub mod index;
pub mod lines;
pub mod markdown;
pub mod model;
pub mod ocr;
pub mod render;
pub mod textlayer;

// Re-export commonly used types
pub use config::{
    AnnotationKind, DocumentFilters, HeaderStyle, HighlightLayout, PageTarget, RunOptions,
};
pub use engine::{run_with_ocr, DocumentRecord, PageIssue, RunSummary};
pub use error::{Error, Result};
pub use model::{Document, Highlight, Page, PenKind, SourceKind, Stroke};
pub use ocr::{OcrEngine, OcrWord, TesseractCli};

use std::path::Path;

/// Process an export tree end to end with the given options.
///
/// Convenience wrapper over [`engine::run`] accepting anything path-like.
pub fn run(
    source: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    options: &RunOptions,
) -> Result<RunSummary> {
    engine::run(source.as_ref(), dest.as_ref(), options)
}
