//! Ink stroke types.

use serde::{Deserialize, Serialize};

/// Pen kind used for a stroke.
///
/// Code points cover both generations of the device tool palette; the decoder
/// maps unknown codes to [`PenKind::Ballpoint`] rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenKind {
    Ballpoint,
    Fineliner,
    Marker,
    Pencil,
    MechanicalPencil,
    Brush,
    Highlighter,
    Calligraphy,
    Eraser,
    EraseArea,
}

impl PenKind {
    /// Map a device pen code to a pen kind. Returns `None` for unknown codes.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            2 | 15 => Some(PenKind::Ballpoint),
            4 | 17 => Some(PenKind::Fineliner),
            3 | 16 => Some(PenKind::Marker),
            1 | 14 => Some(PenKind::Pencil),
            7 | 13 => Some(PenKind::MechanicalPencil),
            0 | 12 => Some(PenKind::Brush),
            5 | 18 => Some(PenKind::Highlighter),
            21 => Some(PenKind::Calligraphy),
            6 => Some(PenKind::Eraser),
            8 => Some(PenKind::EraseArea),
            _ => None,
        }
    }

    /// Whether strokes of this kind are highlight marks over text.
    pub fn is_highlighter(self) -> bool {
        matches!(self, PenKind::Highlighter)
    }

    /// Whether this kind erases rather than draws.
    pub fn is_eraser(self) -> bool {
        matches!(self, PenKind::Eraser | PenKind::EraseArea)
    }
}

/// Ink color of a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeColor {
    #[default]
    Black,
    Gray,
    White,
}

impl StrokeColor {
    /// Map a device color code. Unknown codes fall back to black.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => StrokeColor::Gray,
            2 => StrokeColor::White,
            _ => StrokeColor::Black,
        }
    }

    /// Normalized RGB components.
    pub fn rgb(self) -> (f32, f32, f32) {
        match self {
            StrokeColor::Black => (0.0, 0.0, 0.0),
            StrokeColor::Gray => (0.5, 0.5, 0.5),
            StrokeColor::White => (1.0, 1.0, 1.0),
        }
    }
}

/// One sampled pen position.
///
/// Points within a stroke are stored in draw order. Overlap rendering
/// depends on that order, so it must never be re-sorted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Device-space x, in canvas pixels.
    pub x: f32,
    /// Device-space y, in canvas pixels (origin top-left, y down).
    pub y: f32,
    /// Pen speed at this sample.
    pub speed: f32,
    /// Pen tilt at this sample.
    pub tilt: f32,
    /// Instantaneous nib width at this sample.
    pub width: f32,
    /// Pen pressure at this sample.
    pub pressure: f32,
}

/// One continuous ink mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// Pen kind.
    pub pen: PenKind,
    /// Ink color.
    pub color: StrokeColor,
    /// Base stroke width in device pixels.
    pub width: f32,
    /// Ordered point sequence (draw order).
    pub points: Vec<Point>,
}

impl Stroke {
    /// Axis-aligned bounding rectangle of the stroke in device space,
    /// expanded by half the base width. `None` for point-less strokes.
    pub fn bounds(&self) -> Option<super::DeviceRect> {
        let first = self.points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &self.points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let pad = self.width / 2.0;
        Some(super::DeviceRect {
            x: min_x - pad,
            y: min_y - pad,
            width: (max_x - min_x) + self.width,
            height: (max_y - min_y) + self.width,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pen_codes_both_generations() {
        assert_eq!(PenKind::from_code(5), Some(PenKind::Highlighter));
        assert_eq!(PenKind::from_code(18), Some(PenKind::Highlighter));
        assert_eq!(PenKind::from_code(2), Some(PenKind::Ballpoint));
        assert_eq!(PenKind::from_code(15), Some(PenKind::Ballpoint));
        assert_eq!(PenKind::from_code(99), None);
    }

    #[test]
    fn test_highlighter_and_eraser_classification() {
        assert!(PenKind::Highlighter.is_highlighter());
        assert!(!PenKind::Marker.is_highlighter());
        assert!(PenKind::Eraser.is_eraser());
        assert!(PenKind::EraseArea.is_eraser());
        assert!(!PenKind::Brush.is_eraser());
    }

    #[test]
    fn test_stroke_bounds_padded_by_width() {
        let stroke = Stroke {
            pen: PenKind::Fineliner,
            color: StrokeColor::Black,
            width: 4.0,
            points: vec![
                Point { x: 10.0, y: 20.0, speed: 0.0, tilt: 0.0, width: 4.0, pressure: 1.0 },
                Point { x: 30.0, y: 25.0, speed: 0.0, tilt: 0.0, width: 4.0, pressure: 1.0 },
            ],
        };
        let b = stroke.bounds().unwrap();
        assert_eq!(b.x, 8.0);
        assert_eq!(b.y, 18.0);
        assert_eq!(b.width, 24.0);
        assert_eq!(b.height, 9.0);
    }

    #[test]
    fn test_empty_stroke_has_no_bounds() {
        let stroke = Stroke {
            pen: PenKind::Fineliner,
            color: StrokeColor::Black,
            width: 2.0,
            points: vec![],
        };
        assert!(stroke.bounds().is_none());
    }
}
