//! Document-level types.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Page;

/// What kind of source a document is backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Annotations over an imported PDF.
    Pdf,
    /// A native notebook with no backing file.
    Notebook,
}

/// A fully loaded document: identity, page ordering, and source association.
/// Immutable once loaded for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document identifier (the export tree uuid).
    pub uuid: String,

    /// Display name shown on the device; output artifacts are named from it.
    pub name: String,

    /// Parent folder identifier (empty at the tree root).
    pub parent: String,

    /// Resolved folder path on the device, used by path filtering and
    /// Markdown output routing (e.g. `/research/2024`).
    pub path: String,

    /// Source kind.
    pub kind: SourceKind,

    /// Path to the source PDF. `None` for notebooks, and for PDF-backed
    /// documents whose backing file is missing from the export tree (those
    /// fall back to device-native page geometry).
    pub source_pdf: Option<PathBuf>,

    /// Last modification time from the device manifest.
    pub modified: Option<DateTime<Utc>>,

    /// Pages in index order; indices are contiguous from zero.
    pub pages: Vec<Page>,
}

impl Document {
    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Whether any page carries an annotation.
    pub fn is_annotated(&self) -> bool {
        self.pages.iter().any(|p| p.is_annotated())
    }

    /// Zero-based indices of annotated pages, in original relative order.
    pub fn annotated_page_indices(&self) -> Vec<usize> {
        self.pages
            .iter()
            .filter(|p| p.is_annotated())
            .map(|p| p.index)
            .collect()
    }

    /// Whether any page carries a highlight with non-empty text.
    pub fn has_highlight_text(&self) -> bool {
        self.pages.iter().any(|p| p.highlight_texts().next().is_some())
    }

    /// Display name sanitized for use in file names.
    pub fn file_stem(&self) -> String {
        self.name
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c => c,
            })
            .collect::<String>()
            .trim()
            .to_string()
    }
}
