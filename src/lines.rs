//! Decoder for the device's binary per-page annotation blobs.
//!
//! A blob is a 43-byte ASCII header (`reMarkable .lines file, version=N`,
//! space padded) followed by little-endian fixed-width records: layers,
//! strokes, points. Decoding goes through an explicit schema table keyed by
//! the header version, so unknown future versions degrade predictably to a
//! page with zero strokes instead of being mis-parsed.

use crate::error::Error;
use crate::model::{PenKind, Point, Stroke, StrokeColor};

/// Length of the ASCII header.
const HEADER_LEN: usize = 43;
/// Header prefix up to the version digits.
const HEADER_PREFIX: &str = "reMarkable .lines file, version=";

/// Upper bounds used to reject internally inconsistent counts before they
/// turn into absurd allocations.
const MAX_LAYERS: i32 = 128;
const MAX_STROKES_PER_LAYER: i32 = 200_000;
const MAX_POINTS_PER_STROKE: i32 = 200_000;

/// Per-version record schema. New format revisions extend this table.
#[derive(Debug, Clone, Copy)]
struct StrokeSchema {
    /// v5 inserts one extra 32-bit field between width and point count.
    extra_stroke_field: bool,
}

/// Schema dispatch, keyed by the header version.
fn schema_for(version: u32) -> Option<StrokeSchema> {
    match version {
        3 => Some(StrokeSchema { extra_stroke_field: false }),
        5 => Some(StrokeSchema { extra_stroke_field: true }),
        _ => None,
    }
}

/// Result of decoding one page blob.
///
/// `issue` carries at most one degradation event for the page
/// ([`Error::UnsupportedFormatVersion`] or [`Error::MalformedAnnotationData`]);
/// strokes parsed cleanly before a truncation point are always kept.
#[derive(Debug)]
pub struct DecodedPage {
    /// Strokes in draw order (layers flattened in layer order).
    pub strokes: Vec<Stroke>,
    /// Degradation event for this page, if any.
    pub issue: Option<Error>,
}

impl DecodedPage {
    fn empty(issue: Option<Error>) -> Self {
        Self { strokes: Vec::new(), issue }
    }
}

/// Decode one page's annotation blob.
pub fn decode_page(blob: &[u8]) -> DecodedPage {
    let version = match parse_header(blob) {
        Ok(v) => v,
        Err(e) => return DecodedPage::empty(Some(e)),
    };

    let Some(schema) = schema_for(version) else {
        return DecodedPage::empty(Some(Error::UnsupportedFormatVersion { version }));
    };

    let mut reader = Reader::new(&blob[HEADER_LEN..]);
    let mut strokes = Vec::new();

    match decode_body(&mut reader, schema, &mut strokes) {
        Ok(()) => DecodedPage { strokes, issue: None },
        Err(detail) => DecodedPage {
            strokes,
            issue: Some(Error::MalformedAnnotationData(detail)),
        },
    }
}

fn decode_body(
    reader: &mut Reader<'_>,
    schema: StrokeSchema,
    strokes: &mut Vec<Stroke>,
) -> Result<(), String> {
    let layer_count = reader.read_i32("layer count")?;
    if !(0..=MAX_LAYERS).contains(&layer_count) {
        return Err(format!("implausible layer count {layer_count}"));
    }

    for layer in 0..layer_count {
        let stroke_count = reader.read_i32("stroke count")?;
        if !(0..=MAX_STROKES_PER_LAYER).contains(&stroke_count) {
            return Err(format!(
                "implausible stroke count {stroke_count} in layer {layer}"
            ));
        }

        for _ in 0..stroke_count {
            let stroke = decode_stroke(reader, schema)?;
            strokes.push(stroke);
        }
    }
    Ok(())
}

fn decode_stroke(reader: &mut Reader<'_>, schema: StrokeSchema) -> Result<Stroke, String> {
    let pen_code = reader.read_i32("pen kind")?;
    let color_code = reader.read_i32("color")?;
    let _pad = reader.read_i32("stroke padding")?;
    let width = reader.read_f32("stroke width")?;
    if schema.extra_stroke_field {
        let _unknown = reader.read_f32("stroke extra field")?;
    }
    let point_count = reader.read_i32("point count")?;
    if !(0..=MAX_POINTS_PER_STROKE).contains(&point_count) {
        return Err(format!("implausible point count {point_count}"));
    }

    let pen = PenKind::from_code(pen_code).unwrap_or_else(|| {
        log::warn!("unknown pen code {pen_code}, treating as ballpoint");
        PenKind::Ballpoint
    });

    let mut points = Vec::with_capacity(point_count as usize);
    for _ in 0..point_count {
        points.push(Point {
            x: reader.read_f32("point x")?,
            y: reader.read_f32("point y")?,
            speed: reader.read_f32("point speed")?,
            tilt: reader.read_f32("point tilt")?,
            width: reader.read_f32("point width")?,
            pressure: reader.read_f32("point pressure")?,
        });
    }

    Ok(Stroke {
        pen,
        color: StrokeColor::from_code(color_code),
        width,
        points,
    })
}

/// Parse the header and return the declared format version.
fn parse_header(blob: &[u8]) -> Result<u32, Error> {
    if blob.len() < HEADER_LEN {
        return Err(Error::MalformedAnnotationData(format!(
            "blob too short for header ({} bytes)",
            blob.len()
        )));
    }
    let header = &blob[..HEADER_LEN];
    if !header.starts_with(HEADER_PREFIX.as_bytes()) {
        return Err(Error::MalformedAnnotationData(
            "missing lines-file magic".into(),
        ));
    }
    let rest = &header[HEADER_PREFIX.len()..];
    let digits: Vec<u8> = rest
        .iter()
        .copied()
        .take_while(|b| b.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return Err(Error::MalformedAnnotationData(
            "missing version digits in header".into(),
        ));
    }
    // Safe: digits are ASCII.
    let version: u32 = String::from_utf8_lossy(&digits)
        .parse()
        .map_err(|_| Error::MalformedAnnotationData("unparsable version".into()))?;
    Ok(version)
}

/// Little-endian cursor over the blob body.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], String> {
        if self.pos + n > self.data.len() {
            return Err(format!(
                "truncated at byte {} while reading {what}",
                HEADER_LEN + self.pos
            ));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_i32(&mut self, what: &str) -> Result<i32, String> {
        let b = self.take(4, what)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_f32(&mut self, what: &str) -> Result<f32, String> {
        let b = self.take(4, what)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}
