//! PNG backend.
//!
//! Draws the overlay onto a white bitmap, stamping round nibs along each
//! stroke segment. The same bitmap doubles as OCR input for pages whose
//! source PDF has no text layer.

use std::path::Path;

use image::{Rgba, RgbaImage};

use super::PageOverlay;
use crate::error::Result;

/// Raster scale: pixels per PDF point (144 dpi).
pub const RASTER_PX_PER_PT: f32 = 2.0;

fn to_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Source-over blend of `color` at `alpha` onto one pixel.
fn blend(image: &mut RgbaImage, x: i64, y: i64, color: (f32, f32, f32), alpha: f32) {
    if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 {
        return;
    }
    let px = image.get_pixel_mut(x as u32, y as u32);
    let mix = |src: u8, dst: u8| -> u8 {
        (src as f32 * alpha + dst as f32 * (1.0 - alpha)).round() as u8
    };
    *px = Rgba([
        mix(to_channel(color.0), px[0]),
        mix(to_channel(color.1), px[1]),
        mix(to_channel(color.2), px[2]),
        255,
    ]);
}

fn stamp_disc(image: &mut RgbaImage, cx: f32, cy: f32, radius: f32, color: (f32, f32, f32), alpha: f32) {
    let r = radius.max(0.5);
    let r2 = r * r;
    let x0 = (cx - r).floor() as i64;
    let x1 = (cx + r).ceil() as i64;
    let y0 = (cy - r).floor() as i64;
    let y1 = (cy + r).ceil() as i64;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            if dx * dx + dy * dy <= r2 {
                blend(image, x, y, color, alpha);
            }
        }
    }
}

fn stamp_segment(
    image: &mut RgbaImage,
    from: (f32, f32),
    to: (f32, f32),
    radius: f32,
    color: (f32, f32, f32),
    alpha: f32,
) {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let length = (dx * dx + dy * dy).sqrt();
    // Stamp spacing of half a radius keeps the line solid without
    // re-blending the same pixels too often.
    let steps = (length / (radius * 0.5).max(0.5)).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        stamp_disc(image, from.0 + dx * t, from.1 + dy * t, radius, color, alpha);
    }
}

/// Rasterize an overlay onto a white page bitmap.
pub fn rasterize(overlay: &PageOverlay) -> RgbaImage {
    let width = (overlay.page_width * RASTER_PX_PER_PT).ceil().max(1.0) as u32;
    let height = (overlay.page_height * RASTER_PX_PER_PT).ceil().max(1.0) as u32;
    let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

    // PDF bottom-left origin to image top-left.
    let to_px = |x: f32, y: f32| -> (f32, f32) {
        (
            x * RASTER_PX_PER_PT,
            (overlay.page_height - y) * RASTER_PX_PER_PT,
        )
    };

    for fill in &overlay.fills {
        let (left, top) = to_px(fill.rect.x, fill.rect.y + fill.rect.height);
        let w = (fill.rect.width * RASTER_PX_PER_PT).ceil() as i64;
        let h = (fill.rect.height * RASTER_PX_PER_PT).ceil() as i64;
        for dy in 0..h {
            for dx in 0..w {
                blend(
                    &mut image,
                    left as i64 + dx,
                    top as i64 + dy,
                    fill.color,
                    fill.opacity,
                );
            }
        }
    }

    for path in &overlay.paths {
        let radius = (path.width.max(0.1) * RASTER_PX_PER_PT) / 2.0;
        let mapped: Vec<(f32, f32)> = path.points.iter().map(|&(x, y)| to_px(x, y)).collect();
        match mapped.as_slice() {
            [] => {}
            [only] => stamp_disc(&mut image, only.0, only.1, radius, path.color, path.opacity),
            _ => {
                for pair in mapped.windows(2) {
                    stamp_segment(&mut image, pair[0], pair[1], radius, path.color, path.opacity);
                }
            }
        }
    }

    image
}

/// Rasterize an overlay and write it as PNG.
pub fn render_png(overlay: &PageOverlay, path: &Path) -> Result<()> {
    let image = rasterize(overlay);
    image.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}
