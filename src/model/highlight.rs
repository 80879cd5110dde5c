//! Highlight types.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in device space (canvas pixels, origin
/// top-left, y pointing down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl DeviceRect {
    /// Rectangle area; zero for degenerate rects.
    pub fn area(&self) -> f32 {
        (self.width.max(0.0)) * (self.height.max(0.0))
    }

    /// Area of the intersection with another rectangle.
    pub fn intersection_area(&self, other: &DeviceRect) -> f32 {
        let left = self.x.max(other.x);
        let right = (self.x + self.width).min(other.x + other.width);
        let top = self.y.max(other.y);
        let bottom = (self.y + self.height).min(other.y + other.height);
        if right <= left || bottom <= top {
            0.0
        } else {
            (right - left) * (bottom - top)
        }
    }

    /// Vertical gap between this rect and another; zero when they overlap
    /// vertically.
    pub fn vertical_gap(&self, other: &DeviceRect) -> f32 {
        let self_bottom = self.y + self.height;
        let other_bottom = other.y + other.height;
        if other.y > self_bottom {
            other.y - self_bottom
        } else if self.y > other_bottom {
            self.y - other_bottom
        } else {
            0.0
        }
    }
}

/// Color tag of a highlight mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightColor {
    #[default]
    Yellow,
    Green,
    Pink,
    Blue,
    Red,
    Gray,
}

impl HighlightColor {
    /// Map a device highlight color code. Legacy and unknown codes render
    /// yellow.
    pub fn from_code(code: i32) -> Self {
        match code {
            4 => HighlightColor::Green,
            5 => HighlightColor::Pink,
            6 => HighlightColor::Blue,
            7 => HighlightColor::Red,
            8 => HighlightColor::Gray,
            _ => HighlightColor::Yellow,
        }
    }

    /// Normalized RGB components for the translucent fill.
    pub fn rgb(self) -> (f32, f32, f32) {
        match self {
            HighlightColor::Yellow => (1.0, 0.92, 0.23),
            HighlightColor::Green => (0.55, 0.87, 0.37),
            HighlightColor::Pink => (0.96, 0.49, 0.73),
            HighlightColor::Blue => (0.41, 0.69, 0.96),
            HighlightColor::Red => (0.94, 0.38, 0.34),
            HighlightColor::Gray => (0.65, 0.65, 0.65),
        }
    }
}

/// A marked span of underlying document text.
///
/// A highlight whose extraction produced no text is retained for rendering
/// but excluded from Markdown output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    /// Extracted or derived text span (may be empty).
    pub text: String,
    /// One or more bounding rectangles in device space.
    pub rects: Vec<DeviceRect>,
    /// Zero-based index of the owning page.
    pub page_index: usize,
    /// Color tag; yellow when untagged.
    pub color: HighlightColor,
}

impl Highlight {
    /// Whether this highlight carries extractable text (and therefore
    /// participates in Markdown output and the "annotated" classification).
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection_area() {
        let a = DeviceRect { x: 0.0, y: 0.0, width: 10.0, height: 10.0 };
        let b = DeviceRect { x: 5.0, y: 5.0, width: 10.0, height: 10.0 };
        assert_eq!(a.intersection_area(&b), 25.0);

        let c = DeviceRect { x: 20.0, y: 0.0, width: 5.0, height: 5.0 };
        assert_eq!(a.intersection_area(&c), 0.0);
    }

    #[test]
    fn test_vertical_gap() {
        let a = DeviceRect { x: 0.0, y: 0.0, width: 10.0, height: 10.0 };
        let b = DeviceRect { x: 0.0, y: 14.0, width: 10.0, height: 10.0 };
        assert_eq!(a.vertical_gap(&b), 4.0);
        assert_eq!(b.vertical_gap(&a), 4.0);

        let overlapping = DeviceRect { x: 0.0, y: 5.0, width: 10.0, height: 10.0 };
        assert_eq!(a.vertical_gap(&overlapping), 0.0);
    }

    #[test]
    fn test_color_codes() {
        assert_eq!(HighlightColor::from_code(4), HighlightColor::Green);
        assert_eq!(HighlightColor::from_code(3), HighlightColor::Yellow);
        assert_eq!(HighlightColor::from_code(-1), HighlightColor::Yellow);
    }

    #[test]
    fn test_has_text() {
        let mut hl = Highlight {
            text: "  ".into(),
            rects: vec![],
            page_index: 0,
            color: HighlightColor::Yellow,
        };
        assert!(!hl.has_text());
        hl.text = "Hello".into();
        assert!(hl.has_text());
    }
}
