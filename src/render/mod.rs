//! Page rendering.
//!
//! [`build_overlay`] maps a page's annotations into PDF page space once; the
//! backends (`overlay` for PDF content streams, `svg`, `raster`) all consume
//! the same [`PageOverlay`] so every output agrees on geometry.

mod raster;
mod svg;

pub mod overlay;

pub use raster::{render_png, RASTER_PX_PER_PT};
pub use svg::render_svg;

use crate::config::AnnotationKind;
use crate::geometry::{PageMapper, PdfRect};
use crate::model::{Page, PenKind};

/// One mapped ink path: device stroke projected into page space.
#[derive(Debug, Clone)]
pub struct InkPath {
    /// Polyline vertices in points, origin bottom-left.
    pub points: Vec<(f32, f32)>,
    /// Line width in points.
    pub width: f32,
    /// Stroke color, each channel in `0.0..=1.0`.
    pub color: (f32, f32, f32),
    /// Stroke alpha; `1.0` for opaque pens.
    pub opacity: f32,
}

/// One mapped highlight fill rectangle.
#[derive(Debug, Clone)]
pub struct FillRect {
    pub rect: PdfRect,
    pub color: (f32, f32, f32),
    pub opacity: f32,
}

/// Everything a backend needs to draw one page's annotations.
#[derive(Debug, Clone)]
pub struct PageOverlay {
    pub page_width: f32,
    pub page_height: f32,
    pub paths: Vec<InkPath>,
    pub fills: Vec<FillRect>,
}

impl PageOverlay {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.fills.is_empty()
    }
}

/// Highlight fill alpha.
const HIGHLIGHT_OPACITY: f32 = 0.35;

fn pen_opacity(pen: PenKind) -> f32 {
    match pen {
        PenKind::Highlighter => 0.4,
        PenKind::Pencil | PenKind::MechanicalPencil => 0.75,
        _ => 1.0,
    }
}

/// Map a page's annotations into page space, honoring the annotation-kind
/// selection.
///
/// Eraser strokes never render. Highlighter strokes render as translucent
/// ink only when highlights are excluded from the run; otherwise their marks
/// are represented by the page's highlight rectangles instead, so they are
/// skipped here to avoid drawing the same mark twice.
pub fn build_overlay(page: &Page, mapper: &PageMapper, kind: AnnotationKind) -> PageOverlay {
    let (page_width, page_height) = mapper.page_size();
    let mut paths = Vec::new();
    let mut fills = Vec::new();

    if kind.includes_scribbles() {
        for stroke in &page.strokes {
            if stroke.pen.is_eraser() {
                continue;
            }
            if stroke.pen.is_highlighter() && kind.includes_highlights() {
                continue;
            }
            if stroke.points.is_empty() {
                continue;
            }
            paths.push(InkPath {
                points: stroke
                    .points
                    .iter()
                    .map(|p| mapper.map_point(p.x, p.y))
                    .collect(),
                width: mapper.map_width(stroke.width),
                color: stroke.color.rgb(),
                opacity: pen_opacity(stroke.pen),
            });
        }
    }

    if kind.includes_highlights() {
        for highlight in &page.highlights {
            for rect in &highlight.rects {
                fills.push(FillRect {
                    rect: mapper.map_rect(rect),
                    color: highlight.color.rgb(),
                    opacity: HIGHLIGHT_OPACITY,
                });
            }
        }
    }

    PageOverlay {
        page_width,
        page_height,
        paths,
        fills,
    }
}
