//! Device-space to PDF page-space coordinate mapping.
//!
//! Every stroke point and highlight rectangle passes through a [`PageMapper`]
//! before rendering. The mapper is a pure function of the page's geometry:
//! the same input always yields the same mapped output.

use crate::model::DeviceRect;

/// Device canvas width in pixels.
pub const DEVICE_WIDTH_PX: f32 = 1404.0;
/// Device canvas height in pixels.
pub const DEVICE_HEIGHT_PX: f32 = 1872.0;
/// Device screen density.
pub const DEVICE_DPI: f32 = 226.0;

/// Aspect-ratio tolerance below which scales are treated as matching.
const ASPECT_TOLERANCE: f32 = 1e-3;

/// Device-native page size in points, used when no source PDF exists.
pub fn device_page_size_pts() -> (f32, f32) {
    let pt_per_px = 72.0 / DEVICE_DPI;
    (DEVICE_WIDTH_PX * pt_per_px, DEVICE_HEIGHT_PX * pt_per_px)
}

/// An axis-aligned rectangle in PDF page space (points, origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PdfRect {
    /// Rectangle area; zero for degenerate rects.
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Area of the intersection with another rectangle.
    pub fn intersection_area(&self, other: &PdfRect) -> f32 {
        let left = self.x.max(other.x);
        let right = (self.x + self.width).min(other.x + other.width);
        let bottom = self.y.max(other.y);
        let top = (self.y + self.height).min(other.y + other.height);
        if right <= left || top <= bottom {
            0.0
        } else {
            (right - left) * (top - bottom)
        }
    }
}

/// Maps device-space coordinates onto one page's PDF space.
///
/// Rotation stored on the page is applied first, then a single uniform scale
/// so ink is never stretched non-uniformly: when the destination page is
/// relatively taller than the device canvas the horizontal scale wins and
/// content is centered vertically, and vice versa.
#[derive(Debug, Clone, Copy)]
pub struct PageMapper {
    page_width: f32,
    page_height: f32,
    rotation: u16,
    canvas_width: f32,
    canvas_height: f32,
    scale: f32,
    offset_x: f32,
    offset_y: f32,
}

impl PageMapper {
    /// Build a mapper for a destination page of the given size (points) and
    /// rotation (degrees, multiples of 90).
    pub fn new(page_width: f32, page_height: f32, rotation: u16) -> Self {
        // The canvas the scale is computed against is the post-rotation one.
        let (canvas_width, canvas_height) = match rotation % 360 {
            90 | 270 => (DEVICE_HEIGHT_PX, DEVICE_WIDTH_PX),
            _ => (DEVICE_WIDTH_PX, DEVICE_HEIGHT_PX),
        };

        let scale_x = page_width / canvas_width;
        let scale_y = page_height / canvas_height;

        let device_aspect = canvas_height / canvas_width;
        let page_aspect = page_height / page_width;

        let (scale, offset_x, offset_y) = if (page_aspect - device_aspect).abs() <= ASPECT_TOLERANCE
        {
            (scale_x, 0.0, 0.0)
        } else if page_aspect > device_aspect {
            // Page relatively taller: keep the horizontal scale, center
            // vertically.
            let s = scale_x;
            (s, 0.0, (page_height - canvas_height * s) / 2.0)
        } else {
            // Page relatively wider: keep the vertical scale, center
            // horizontally.
            let s = scale_y;
            (s, (page_width - canvas_width * s) / 2.0, 0.0)
        };

        Self {
            page_width,
            page_height,
            rotation: rotation % 360,
            canvas_width,
            canvas_height,
            scale,
            offset_x,
            offset_y,
        }
    }

    /// Mapper for a device-native page (no source PDF).
    pub fn device_native() -> Self {
        let (w, h) = device_page_size_pts();
        Self::new(w, h, 0)
    }

    /// Destination page size in points.
    pub fn page_size(&self) -> (f32, f32) {
        (self.page_width, self.page_height)
    }

    /// The uniform scale factor applied after rotation.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Apply the page rotation to a raw device point, yielding coordinates in
    /// the post-rotation canvas (still top-left origin, y down).
    fn rotate(&self, x: f32, y: f32) -> (f32, f32) {
        match self.rotation {
            90 => (y, DEVICE_WIDTH_PX - x),
            180 => (DEVICE_WIDTH_PX - x, DEVICE_HEIGHT_PX - y),
            270 => (DEVICE_HEIGHT_PX - y, x),
            _ => (x, y),
        }
    }

    /// Map a device point to PDF page space (points, origin bottom-left).
    pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
        let (rx, ry) = self.rotate(x, y);
        let px = self.offset_x + rx * self.scale;
        let py_top_down = self.offset_y + ry * self.scale;
        (px, self.page_height - py_top_down)
    }

    /// Map a stroke width from device pixels to points.
    pub fn map_width(&self, width: f32) -> f32 {
        width * self.scale
    }

    /// Map a device rectangle to PDF page space, clipped to page bounds.
    /// Overflowing rectangles are clipped, never discarded.
    pub fn map_rect(&self, rect: &DeviceRect) -> PdfRect {
        let (x1, y1) = self.map_point(rect.x, rect.y);
        let (x2, y2) = self.map_point(rect.x + rect.width, rect.y + rect.height);

        let left = x1.min(x2).clamp(0.0, self.page_width);
        let right = x1.max(x2).clamp(0.0, self.page_width);
        let bottom = y1.min(y2).clamp(0.0, self.page_height);
        let top = y1.max(y2).clamp(0.0, self.page_height);

        PdfRect {
            x: left,
            y: bottom,
            width: right - left,
            height: top - bottom,
        }
    }
}
