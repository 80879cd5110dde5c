//! Highlight extraction.
//!
//! Two paths produce [`Highlight`] entities for a page:
//!
//! 1. **Records**: the export tree carries a pre-computed highlight record
//!    file per page. Its text and rectangles are trusted as-is.
//! 2. **Derivation**: highlighter-pen strokes are turned into device-space
//!    mark rectangles and projected onto the page's text runs (native text
//!    layer or OCR words). A run is selected when a mark covers more than
//!    half of the run's area.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::geometry::PageMapper;
use crate::model::{DeviceRect, Highlight, HighlightColor, Stroke};
use crate::textlayer::TextRun;

/// A text run is associated with a mark when their intersection exceeds this
/// fraction of the run's area. When two runs tie exactly, the run earlier in
/// reading order wins (selection iterates runs in reading order).
pub const MIN_OVERLAP_RATIO: f32 = 0.5;

/// Device highlight record file: `<uuid>.highlights/<page-uuid>.json`.
#[derive(Debug, Deserialize)]
struct HighlightRecordFile {
    #[serde(default)]
    highlights: Vec<Vec<HighlightRecord>>,
}

#[derive(Debug, Deserialize)]
struct HighlightRecord {
    #[serde(default)]
    text: String,
    #[serde(default)]
    color: i32,
    #[serde(default)]
    rects: Vec<RecordRect>,
}

#[derive(Debug, Deserialize)]
struct RecordRect {
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
}

/// Load pre-computed highlight records for a page. Each record's text and
/// rectangles are used directly.
pub fn load_highlight_records(path: &Path, page_index: usize) -> Result<Vec<Highlight>> {
    let data = fs::read(path)?;
    let file: HighlightRecordFile = serde_json::from_slice(&data)?;

    let mut highlights = Vec::new();
    for group in file.highlights {
        for record in group {
            highlights.push(Highlight {
                text: record.text,
                rects: record
                    .rects
                    .iter()
                    .map(|r| DeviceRect {
                        x: r.x,
                        y: r.y,
                        width: r.width,
                        height: r.height,
                    })
                    .collect(),
                page_index,
                color: HighlightColor::from_code(record.color),
            });
        }
    }
    Ok(highlights)
}

/// Derive highlights from highlighter-pen strokes by projecting their marks
/// onto the page's text runs.
///
/// `runs` may come from the native text layer or from OCR word boxes; an
/// empty slice yields highlights with empty text spans (the marks still
/// render). Contiguous marks (vertical gap at most half the shorter rect's
/// height) fuse into one highlight whose text concatenates the selected runs
/// in reading order.
pub fn derive_highlights(
    marks: &[&Stroke],
    runs: &[TextRun],
    mapper: &PageMapper,
    page_index: usize,
) -> Vec<Highlight> {
    let rects: Vec<DeviceRect> = marks.iter().filter_map(|s| s.bounds()).collect();
    if rects.is_empty() {
        return Vec::new();
    }

    group_contiguous(&rects)
        .into_iter()
        .map(|group| {
            let text = select_text(&group, runs, mapper);
            Highlight {
                text,
                rects: group,
                page_index,
                color: HighlightColor::Yellow,
            }
        })
        .collect()
}

/// Partition mark rectangles into contiguous groups. Marks join a group when
/// their vertical gap to any member is at most half the shorter rect's
/// height (consecutive highlighted lines fuse; separate paragraphs do not).
fn group_contiguous(rects: &[DeviceRect]) -> Vec<Vec<DeviceRect>> {
    let mut groups: Vec<Vec<DeviceRect>> = Vec::new();

    for rect in rects {
        let joined = groups.iter_mut().find(|group| {
            group.iter().any(|member| {
                let max_gap = member.height.min(rect.height) / 2.0;
                rect.vertical_gap(member) <= max_gap
            })
        });
        match joined {
            Some(group) => group.push(*rect),
            None => groups.push(vec![*rect]),
        }
    }
    groups
}

/// Concatenate the text of runs covered by a mark group, in reading order.
fn select_text(group: &[DeviceRect], runs: &[TextRun], mapper: &PageMapper) -> String {
    let mapped: Vec<crate::geometry::PdfRect> =
        group.iter().map(|r| mapper.map_rect(r)).collect();

    let mut selected = Vec::new();
    for run in runs {
        let run_area = run.rect.area();
        if run_area <= 0.0 {
            continue;
        }
        let covered = mapped
            .iter()
            .map(|m| m.intersection_area(&run.rect))
            .fold(0.0f32, f32::max);
        if covered > run_area * MIN_OVERLAP_RATIO {
            selected.push(run.text.trim());
        }
    }
    selected.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PdfRect;
    use crate::model::{PenKind, Point, StrokeColor};

    fn highlighter_stroke(x0: f32, y0: f32, x1: f32, y1: f32, width: f32) -> Stroke {
        let mk = |x, y| Point { x, y, speed: 0.0, tilt: 0.0, width, pressure: 1.0 };
        Stroke {
            pen: PenKind::Highlighter,
            color: StrokeColor::Black,
            width,
            points: vec![mk(x0, y0), mk(x1, y1)],
        }
    }

    fn run(text: &str, x: f32, y: f32, width: f32, height: f32) -> TextRun {
        TextRun { text: text.into(), rect: PdfRect { x, y, width, height } }
    }

    /// Mapper with scale 0.5 and no offsets (page 702x936 over 1404x1872).
    fn half_scale_mapper() -> PageMapper {
        PageMapper::new(702.0, 936.0, 0)
    }

    #[test]
    fn test_load_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        std::fs::write(
            &path,
            r#"{"highlights":[[{"text":"Hello world","color":4,
                "rects":[{"x":100,"y":200,"width":300,"height":30}],
                "start":10,"length":11}]]}"#,
        )
        .unwrap();

        let highlights = load_highlight_records(&path, 2).unwrap();
        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights[0].text, "Hello world");
        assert_eq!(highlights[0].page_index, 2);
        assert_eq!(highlights[0].color, HighlightColor::Green);
        assert_eq!(highlights[0].rects[0].width, 300.0);
    }

    #[test]
    fn test_records_with_empty_text_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        std::fs::write(
            &path,
            r#"{"highlights":[[{"color":0,"rects":[{"x":1,"y":2,"width":3,"height":4}]}]]}"#,
        )
        .unwrap();
        let highlights = load_highlight_records(&path, 0).unwrap();
        assert_eq!(highlights.len(), 1);
        assert!(!highlights[0].has_text());
    }

    #[test]
    fn test_derive_selects_majority_covered_runs() {
        let mapper = half_scale_mapper();
        // Device mark across y 200..230, x 100..500. Maps to PDF
        // x 50..250, y (936 - 115)=821 .. (936 - 100)=836.
        let mark = highlighter_stroke(100.0, 215.0, 500.0, 215.0, 30.0);
        let marks = [&mark];

        let runs = vec![
            run("covered", 60.0, 822.0, 120.0, 10.0),
            run("far away", 60.0, 400.0, 120.0, 10.0),
        ];
        let highlights = derive_highlights(&marks, &runs, &mapper, 0);
        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights[0].text, "covered");
    }

    #[test]
    fn test_derive_concatenates_in_reading_order() {
        let mapper = half_scale_mapper();
        // Two highlighter lines close together: one contiguous group.
        let top = highlighter_stroke(100.0, 200.0, 500.0, 200.0, 30.0);
        let bottom = highlighter_stroke(100.0, 240.0, 500.0, 240.0, 30.0);
        let marks = [&bottom, &top]; // deliberately out of order

        // PDF y for device y=200 band: ~828; for y=240 band: ~808.
        let runs = vec![
            run("first line", 55.0, 824.0, 150.0, 10.0),
            run("second line", 55.0, 804.0, 150.0, 10.0),
        ];
        let highlights = derive_highlights(&marks, &runs, &mapper, 0);
        assert_eq!(highlights.len(), 1, "contiguous marks fuse");
        assert_eq!(highlights[0].text, "first line second line");
    }

    #[test]
    fn test_derive_separate_groups() {
        let mapper = half_scale_mapper();
        let top = highlighter_stroke(100.0, 200.0, 500.0, 200.0, 20.0);
        let far = highlighter_stroke(100.0, 800.0, 500.0, 800.0, 20.0);
        let marks = [&top, &far];
        let highlights = derive_highlights(&marks, &[], &mapper, 3);
        assert_eq!(highlights.len(), 2);
        assert!(highlights.iter().all(|h| !h.has_text()));
        assert!(highlights.iter().all(|h| h.page_index == 3));
    }

    #[test]
    fn test_derive_without_runs_yields_empty_span() {
        let mapper = half_scale_mapper();
        let mark = highlighter_stroke(100.0, 200.0, 500.0, 200.0, 30.0);
        let highlights = derive_highlights(&[&mark], &[], &mapper, 0);
        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights[0].text, "");
        assert!(!highlights[0].rects.is_empty(), "mark still renders");
    }

    #[test]
    fn test_half_coverage_is_not_enough() {
        let mapper = half_scale_mapper();
        let mark = highlighter_stroke(100.0, 215.0, 500.0, 215.0, 30.0);
        // Run sticking far out of the mark horizontally: under half covered.
        let runs = vec![run("barely", 200.0, 822.0, 400.0, 10.0)];
        let highlights = derive_highlights(&[&mark], &runs, &mapper, 0);
        assert_eq!(highlights[0].text, "");
    }
}
