//! Page-level types.

use serde::{Deserialize, Serialize};

use super::{Highlight, Stroke};

/// A single page of a loaded document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Zero-based page index. Indices are contiguous and, when a source PDF
    /// exists, match its page count exactly.
    pub index: usize,

    /// Device page identifier, when the manifest carries one.
    pub uuid: Option<String>,

    /// Destination page width in points (source PDF geometry, or the
    /// device-native default for notebooks).
    pub width: f32,

    /// Destination page height in points.
    pub height: f32,

    /// Page rotation in degrees (0, 90, 180, 270), from the source PDF.
    pub rotation: u16,

    /// Ordered ink strokes (draw order).
    pub strokes: Vec<Stroke>,

    /// Ordered highlights.
    pub highlights: Vec<Highlight>,
}

impl Page {
    /// Create an empty page with the given destination geometry.
    pub fn new(index: usize, width: f32, height: f32) -> Self {
        Self {
            index,
            uuid: None,
            width,
            height,
            rotation: 0,
            strokes: Vec::new(),
            highlights: Vec::new(),
        }
    }

    /// A page is annotated iff it owns at least one stroke or one non-empty
    /// highlight. Annotated pages are the membership set of the
    /// annotated-pages-only PDF.
    pub fn is_annotated(&self) -> bool {
        !self.strokes.is_empty() || self.highlights.iter().any(|h| h.has_text())
    }

    /// Highlight texts in page order, empty spans excluded.
    pub fn highlight_texts(&self) -> impl Iterator<Item = &str> {
        self.highlights
            .iter()
            .filter(|h| h.has_text())
            .map(|h| h.text.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Highlight, HighlightColor, PenKind, Stroke, StrokeColor};

    fn empty_highlight(text: &str) -> Highlight {
        Highlight {
            text: text.into(),
            rects: vec![],
            page_index: 0,
            color: HighlightColor::Yellow,
        }
    }

    #[test]
    fn test_annotated_classification() {
        let mut page = Page::new(0, 612.0, 792.0);
        assert!(!page.is_annotated());

        // An empty-text highlight renders but does not mark the page annotated.
        page.highlights.push(empty_highlight(""));
        assert!(!page.is_annotated());

        page.highlights.push(empty_highlight("Hello"));
        assert!(page.is_annotated());

        let mut inked = Page::new(1, 612.0, 792.0);
        inked.strokes.push(Stroke {
            pen: PenKind::Fineliner,
            color: StrokeColor::Black,
            width: 2.0,
            points: vec![],
        });
        assert!(inked.is_annotated());
    }

    #[test]
    fn test_highlight_texts_skip_empty() {
        let mut page = Page::new(0, 612.0, 792.0);
        page.highlights.push(empty_highlight(" first "));
        page.highlights.push(empty_highlight(""));
        page.highlights.push(empty_highlight("second"));
        let texts: Vec<_> = page.highlight_texts().collect();
        assert_eq!(texts, vec!["first", "second"]);
    }
}
