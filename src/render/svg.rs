//! SVG backend: one vector document per page.

use std::fmt::Write as FmtWrite;

use super::PageOverlay;

fn fmt_f(value: f32) -> String {
    format!("{:.2}", value)
}

/// Render an overlay as a standalone SVG document.
///
/// The viewBox is the page in points; PDF's bottom-left origin is flipped to
/// SVG's top-left one during emission, so coordinates in the output read in
/// screen order.
pub fn render_svg(overlay: &PageOverlay) -> String {
    let w = overlay.page_width;
    let h = overlay.page_height;
    let flip = |y: f32| h - y;

    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}pt" height="{h}pt" viewBox="0 0 {w} {h}">"#,
        w = fmt_f(w),
        h = fmt_f(h),
    );
    let _ = writeln!(
        out,
        r#"  <rect width="{}" height="{}" fill="white"/>"#,
        fmt_f(w),
        fmt_f(h)
    );

    for fill in &overlay.fills {
        let (r, g, b) = fill.color;
        let _ = writeln!(
            out,
            r#"  <rect x="{}" y="{}" width="{}" height="{}" fill="rgb({},{},{})" fill-opacity="{}"/>"#,
            fmt_f(fill.rect.x),
            fmt_f(flip(fill.rect.y + fill.rect.height)),
            fmt_f(fill.rect.width),
            fmt_f(fill.rect.height),
            (r * 255.0).round() as u8,
            (g * 255.0).round() as u8,
            (b * 255.0).round() as u8,
            fmt_f(fill.opacity),
        );
    }

    for path in &overlay.paths {
        if path.points.is_empty() {
            continue;
        }
        let (r, g, b) = path.color;
        let points: Vec<String> = path
            .points
            .iter()
            .map(|&(x, y)| format!("{},{}", fmt_f(x), fmt_f(flip(y))))
            .collect();
        let _ = writeln!(
            out,
            r#"  <polyline points="{}" fill="none" stroke="rgb({},{},{})" stroke-width="{}" stroke-opacity="{}" stroke-linecap="round" stroke-linejoin="round"/>"#,
            points.join(" "),
            (r * 255.0).round() as u8,
            (g * 255.0).round() as u8,
            (b * 255.0).round() as u8,
            fmt_f(path.width.max(0.1)),
            fmt_f(path.opacity),
        );
    }

    out.push_str("</svg>\n");
    out
}
