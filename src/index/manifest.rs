//! Serde views of the device's manifest files.
//!
//! The export tree keeps one `<uuid>.metadata` and one `<uuid>.content` JSON
//! file per entry. Fields not needed by the engine are ignored; fields the
//! device sometimes omits carry defaults so a sparse manifest never fails
//! deserialization outright.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// `<uuid>.metadata`: identity and tree placement of one entry.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataFile {
    /// Display name shown on the device.
    #[serde(rename = "visibleName", default)]
    pub visible_name: String,

    /// Parent folder uuid; empty at the root, `"trash"` for deleted entries.
    #[serde(default)]
    pub parent: String,

    /// `"DocumentType"` for documents, `"CollectionType"` for folders.
    #[serde(rename = "type", default)]
    pub entry_type: String,

    /// Soft-delete flag.
    #[serde(default)]
    pub deleted: bool,

    /// Epoch milliseconds, serialized by the device as either a string or a
    /// number depending on firmware generation.
    #[serde(rename = "lastModified", default)]
    pub last_modified: Option<serde_json::Value>,
}

impl MetadataFile {
    /// True for document entries that are still alive.
    pub fn is_live_document(&self) -> bool {
        self.entry_type == "DocumentType" && !self.deleted && self.parent != "trash"
    }

    /// True for folder entries.
    pub fn is_folder(&self) -> bool {
        self.entry_type == "CollectionType"
    }

    /// Last modification time, when parseable.
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        let ms = match self.last_modified.as_ref()? {
            serde_json::Value::String(s) => s.parse::<i64>().ok()?,
            serde_json::Value::Number(n) => n.as_i64()?,
            _ => return None,
        };
        DateTime::<Utc>::from_timestamp_millis(ms)
    }
}

/// `<uuid>.content`: page ordering and source association of one document.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentFile {
    /// `"pdf"`, `"epub"` (device-generated PDF alongside), `"notebook"`, or
    /// absent on old firmware.
    #[serde(rename = "fileType", default)]
    pub file_type: String,

    /// Ordered page uuids. Old firmware omits this and names annotation
    /// files by page index instead.
    #[serde(default)]
    pub pages: Vec<String>,

    /// Declared page count; advisory only (the source PDF wins).
    #[serde(rename = "pageCount", default)]
    pub page_count: i64,
}

impl ContentFile {
    /// Whether this document is backed by a PDF in the export tree.
    pub fn is_pdf_backed(&self) -> bool {
        matches!(self.file_type.as_str(), "pdf" | "epub")
    }
}
