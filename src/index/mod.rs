//! Document index loading.
//!
//! Scans a device export tree, validates the loosely-typed manifests at the
//! boundary, and produces the strict per-document sources the engine decodes.

mod loader;
mod manifest;

pub use loader::{load_documents, DocumentSource, IndexResult, PageSource, SkipReport};
pub use manifest::{ContentFile, MetadataFile};
