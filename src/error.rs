//! Error types for the inkmerge library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for inkmerge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reconciling annotations with documents.
///
/// Per-page and per-document errors are caught at their boundary and surfaced
/// through [`crate::engine::RunSummary`]; only [`Error::ConfigValidation`]
/// aborts a run outright.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An expected companion file (content manifest, metadata) is absent.
    /// The document is excluded from the run.
    #[error("Missing source file for document {uuid}: {path}")]
    MissingSourceFile { uuid: String, path: PathBuf },

    /// The annotation blob declares a format version we cannot decode.
    /// The page is treated as having zero strokes.
    #[error("Unsupported annotation format version {version}")]
    UnsupportedFormatVersion { version: u32 },

    /// The annotation blob is truncated or internally inconsistent.
    /// Strokes parsed before the fault are kept.
    #[error("Malformed annotation data: {0}")]
    MalformedAnnotationData(String),

    /// The OCR fallback failed or returned nothing; the highlight's text
    /// span is left empty.
    #[error("OCR failure: {0}")]
    OcrFailure(String),

    /// A destination artifact could not be written. The document's artifacts
    /// are skipped; the run continues.
    #[error("Failed to write output {path}: {reason}")]
    OutputWriteFailure { path: PathBuf, reason: String },

    /// The configuration is invalid; aborts the run before any document is
    /// processed.
    #[error("Invalid configuration: {0}")]
    ConfigValidation(String),

    /// Error reading or rewriting PDF structure.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Error decoding a device manifest or highlight record.
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    /// Error during rendering (overlay, SVG, PNG, Markdown).
    #[error("Rendering error: {0}")]
    Render(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::Pdf(err.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Render(err.to_string())
    }
}
