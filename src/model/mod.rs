//! Entity model for loaded documents.
//!
//! These types are the strict representation produced by the validated load
//! step: loosely-typed device manifests and binary blobs are rejected or
//! degraded at the boundary, and everything inward of the loader works on
//! these read-only entities.

mod document;
mod highlight;
mod page;
mod stroke;

pub use document::{Document, SourceKind};
pub use highlight::{DeviceRect, Highlight, HighlightColor};
pub use page::Page;
pub use stroke::{PenKind, Point, Stroke, StrokeColor};
