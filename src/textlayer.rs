//! Text-layer extraction: text runs with bounding boxes.
//!
//! Walks a page's content stream tracking the text matrix, emitting one
//! [`TextRun`] per show-text operation. Boxes are approximate (widths are
//! estimated from font size, ascender/descender from fixed ratios), which is
//! plenty for overlap matching against highlight marks.

use lopdf::{content::Content, Document as LopdfDocument, Object, ObjectId};

use crate::error::{Error, Result};
use crate::geometry::PdfRect;

/// A contiguous run of shown text with its approximate bounding box in PDF
/// page space (points, origin bottom-left).
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub rect: PdfRect,
}

/// Estimated average glyph width as a fraction of font size, used when the
/// font program is not consulted.
const AVG_GLYPH_WIDTH: f32 = 0.5;
/// Ascender/descender reach as fractions of font size.
const ASCENT: f32 = 0.8;
const DESCENT: f32 = 0.2;

/// Extract the text runs of one page, sorted in reading order
/// (top-to-bottom, then left-to-right).
///
/// An empty result means the page has no extractable text layer.
pub fn extract_text_runs(doc: &LopdfDocument, page_id: ObjectId) -> Result<Vec<TextRun>> {
    let content_data = page_content(doc, page_id)?;
    let content =
        Content::decode(&content_data).map_err(|e| Error::Pdf(format!("content stream: {e}")))?;

    let mut runs = Vec::new();
    let mut state = TextState::default();

    for op in &content.operations {
        match op.operator.as_str() {
            "BT" => state.begin_text(),
            "ET" => {}
            "Tf" => {
                if let (Some(name), Some(size)) = (
                    op.operands.first().and_then(|o| o.as_name().ok()),
                    op.operands.get(1).and_then(as_number),
                ) {
                    state.font_name = name.to_vec();
                    state.font_size = size;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = two_numbers(&op.operands) {
                    state.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = two_numbers(&op.operands) {
                    state.leading = -ty;
                    state.translate_line(tx, ty);
                }
            }
            "TL" => {
                if let Some(l) = op.operands.first().and_then(as_number) {
                    state.leading = l;
                }
            }
            "Tm" => {
                if op.operands.len() >= 6 {
                    let m: Vec<f32> = op.operands.iter().filter_map(as_number).collect();
                    if m.len() >= 6 {
                        state.set_matrix([m[0], m[1], m[2], m[3], m[4], m[5]]);
                    }
                }
            }
            "T*" => state.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    emit_run(doc, page_id, &mut state, bytes, &mut runs);
                }
            }
            "'" => {
                state.next_line();
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    emit_run(doc, page_id, &mut state, bytes, &mut runs);
                }
            }
            "\"" => {
                state.next_line();
                if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                    emit_run(doc, page_id, &mut state, bytes, &mut runs);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => {
                                emit_run(doc, page_id, &mut state, bytes, &mut runs)
                            }
                            Object::Integer(n) => state.adjust(*n as f32),
                            Object::Real(n) => state.adjust(*n),
                            _ => {}
                        }
                    }
                }
            }
            _ => {}
        }
    }

    // Reading order: top-to-bottom, then left-to-right. The y tolerance
    // keeps runs on one visual line together despite baseline jitter.
    runs.sort_by(|a, b| {
        let line_tol = (a.rect.height.max(b.rect.height)) * 0.5;
        if (a.rect.y - b.rect.y).abs() <= line_tol {
            a.rect
                .x
                .partial_cmp(&b.rect.x)
                .unwrap_or(std::cmp::Ordering::Equal)
        } else {
            b.rect
                .y
                .partial_cmp(&a.rect.y)
                .unwrap_or(std::cmp::Ordering::Equal)
        }
    });

    Ok(runs)
}

fn emit_run(
    doc: &LopdfDocument,
    page_id: ObjectId,
    state: &mut TextState,
    bytes: &[u8],
    runs: &mut Vec<TextRun>,
) {
    let text = decode_text(doc, page_id, &state.font_name, bytes);
    if text.trim().is_empty() {
        // Advance past whitespace-only shows, but emit nothing.
        state.advance_chars(text.chars().count());
        return;
    }

    let size = state.effective_font_size();
    let width = state.estimate_width(text.chars().count());
    let (x, baseline) = state.position();

    runs.push(TextRun {
        text,
        rect: PdfRect {
            x,
            y: baseline - size * DESCENT,
            width,
            height: size * (ASCENT + DESCENT),
        },
    });
    state.advance(width);
}

/// Text matrix tracking, reduced to what box estimation needs.
struct TextState {
    /// Current text matrix [a b c d e f].
    tm: [f32; 6],
    /// Line matrix (start of the current line).
    tlm: [f32; 6],
    font_name: Vec<u8>,
    font_size: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            tm: IDENTITY,
            tlm: IDENTITY,
            font_name: Vec::new(),
            font_size: 12.0,
            leading: 0.0,
        }
    }
}

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

impl TextState {
    fn begin_text(&mut self) {
        self.tm = IDENTITY;
        self.tlm = IDENTITY;
    }

    fn set_matrix(&mut self, m: [f32; 6]) {
        self.tm = m;
        self.tlm = m;
    }

    /// `Td`: translate the line matrix by (tx, ty) in text space.
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let [a, b, c, d, e, f] = self.tlm;
        self.tlm = [a, b, c, d, tx * a + ty * c + e, tx * b + ty * d + f];
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        let leading = self.leading;
        self.translate_line(0.0, -leading);
    }

    fn position(&self) -> (f32, f32) {
        (self.tm[4], self.tm[5])
    }

    fn effective_font_size(&self) -> f32 {
        self.font_size * self.tm[3].abs().max(f32::EPSILON)
    }

    fn estimate_width(&self, chars: usize) -> f32 {
        chars as f32 * self.font_size * AVG_GLYPH_WIDTH * self.tm[0].abs().max(f32::EPSILON)
    }

    fn advance(&mut self, width: f32) {
        self.tm[4] += width;
    }

    fn advance_chars(&mut self, chars: usize) {
        let w = self.estimate_width(chars);
        self.advance(w);
    }

    /// `TJ` number adjustment, thousandths of text space.
    fn adjust(&mut self, amount: f32) {
        self.tm[4] -= amount / 1000.0 * self.font_size * self.tm[0].abs().max(f32::EPSILON);
    }
}

/// Concatenated, decompressed content stream bytes for a page.
fn page_content(doc: &LopdfDocument, page_id: ObjectId) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    for object_id in doc.get_page_contents(page_id) {
        if let Ok(Object::Stream(stream)) = doc.get_object(object_id) {
            // Streams without a Filter fail decompression; their content is
            // already raw.
            let data = stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone());
            content.extend_from_slice(&data);
            content.push(b'\n');
        }
    }
    Ok(content)
}

/// Decode a shown byte string using the page font's encoding, falling back
/// to simple decoding when the font or encoding is unavailable.
fn decode_text(doc: &LopdfDocument, page_id: ObjectId, font_name: &[u8], bytes: &[u8]) -> String {
    if let Ok(fonts) = doc.get_page_fonts(page_id) {
        if let Some(font_dict) = fonts.get(font_name) {
            if let Ok(encoding) = font_dict.get_font_encoding(doc) {
                if let Ok(text) = LopdfDocument::decode_text(&encoding, bytes) {
                    return text;
                }
            }
        }
    }
    decode_text_simple(bytes)
}

/// Simple text decoding fallback when no encoding is available.
fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter_map(|c| {
                if c.len() == 2 {
                    Some(u16::from_be_bytes([c[0], c[1]]))
                } else {
                    None
                }
            })
            .collect();
        return String::from_utf16(&utf16).unwrap_or_default();
    }
    if let Ok(s) = String::from_utf8(bytes.to_vec()) {
        return s;
    }
    // Latin-1 fallback
    bytes.iter().map(|&b| b as char).collect()
}

fn as_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn two_numbers(operands: &[Object]) -> (Option<f32>, Option<f32>) {
    (
        operands.first().and_then(as_number),
        operands.get(1).and_then(as_number),
    )
}
