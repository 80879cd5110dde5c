//! PDF content-stream fragments for page overlays.
//!
//! The fragment produced here is appended to a page's content after the
//! original content has been wrapped in `q`/`Q`, so annotation drawing always
//! starts from a clean graphics state. Translucency goes through ExtGState
//! resources; [`GsRegistry`] collects the alpha values a stream needs so the
//! composer can install matching `/GS*` dictionaries on the page.

use std::fmt::Write as FmtWrite;

use super::PageOverlay;

/// Collects the distinct alpha values used by overlay streams and hands out
/// stable resource names for them.
#[derive(Debug, Default)]
pub struct GsRegistry {
    alphas: Vec<f32>,
}

impl GsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resource name for an alpha value, allocating one if unseen.
    pub fn name_for(&mut self, alpha: f32) -> String {
        let idx = match self
            .alphas
            .iter()
            .position(|a| a.to_bits() == alpha.to_bits())
        {
            Some(idx) => idx,
            None => {
                self.alphas.push(alpha);
                self.alphas.len() - 1
            }
        };
        format!("GSa{}", idx + 1)
    }

    /// All allocated `(name, alpha)` pairs, in allocation order.
    pub fn entries(&self) -> Vec<(String, f32)> {
        self.alphas
            .iter()
            .enumerate()
            .map(|(idx, &a)| (format!("GSa{}", idx + 1), a))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.alphas.is_empty()
    }
}

fn fmt_f(value: f32) -> String {
    format!("{:.3}", value)
}

/// Render an overlay into a PDF content-stream fragment.
///
/// Highlight fills are emitted before ink paths so ink stays visible on top
/// of its own highlights. Every drawing group is bracketed in `q`/`Q`.
pub fn content_stream(overlay: &PageOverlay, gs: &mut GsRegistry) -> Vec<u8> {
    let mut stream = String::new();

    for fill in &overlay.fills {
        if fill.rect.width <= 0.0 || fill.rect.height <= 0.0 {
            continue;
        }
        let (r, g, b) = fill.color;
        stream.push_str("q\n");
        if fill.opacity < 1.0 {
            let _ = writeln!(stream, "/{} gs", gs.name_for(fill.opacity));
        }
        let _ = writeln!(stream, "{} {} {} rg", fmt_f(r), fmt_f(g), fmt_f(b));
        let _ = writeln!(
            stream,
            "{} {} {} {} re",
            fmt_f(fill.rect.x),
            fmt_f(fill.rect.y),
            fmt_f(fill.rect.width),
            fmt_f(fill.rect.height)
        );
        stream.push_str("f\nQ\n");
    }

    for path in &overlay.paths {
        let Some((&(x0, y0), rest)) = path.points.split_first() else {
            continue;
        };
        let (r, g, b) = path.color;
        stream.push_str("q\n");
        if path.opacity < 1.0 {
            let _ = writeln!(stream, "/{} gs", gs.name_for(path.opacity));
        }
        let _ = writeln!(stream, "{} {} {} RG", fmt_f(r), fmt_f(g), fmt_f(b));
        let _ = writeln!(stream, "{} w", fmt_f(path.width.max(0.1)));
        // Round caps and joins read closest to real pen ink.
        stream.push_str("1 J\n1 j\n");
        let _ = writeln!(stream, "{} {} m", fmt_f(x0), fmt_f(y0));
        if rest.is_empty() {
            // Single sample: degenerate segment still leaves a dot with
            // round caps.
            let _ = writeln!(stream, "{} {} l", fmt_f(x0), fmt_f(y0));
        } else {
            for &(x, y) in rest {
                let _ = writeln!(stream, "{} {} l", fmt_f(x), fmt_f(y));
            }
        }
        stream.push_str("S\nQ\n");
    }

    stream.into_bytes()
}
