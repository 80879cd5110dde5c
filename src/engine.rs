//! The reconciliation engine: one call that takes an export tree and a
//! destination directory and emits every requested artifact.
//!
//! Documents are independent, so they are processed in parallel; artifact
//! emission happens per document, and a document that fails is reported and
//! skipped without aborting the run.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use lopdf::Document as LopdfDocument;
use rayon::prelude::*;

use crate::compose;
use crate::config::{PageTarget, RunOptions};
use crate::error::{Error, Result};
use crate::geometry::PageMapper;
use crate::highlights;
use crate::index::{self, DocumentSource, PageSource, SkipReport};
use crate::lines;
use crate::markdown;
use crate::model::{Document, Page, Stroke};
use crate::ocr::{self, OcrEngine};
use crate::render::{self, PageOverlay};
use crate::textlayer::{self, TextRun};

/// One degradation event on one page, reported exactly once per cause.
#[derive(Debug, Clone)]
pub struct PageIssue {
    pub document: String,
    pub page_index: usize,
    pub detail: String,
}

/// One fully processed document, with its manifest identity.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub uuid: String,
    pub name: String,
    /// Last-modified timestamp from the manifest, when present.
    pub modified: Option<DateTime<Utc>>,
}

/// What a run produced.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Documents fully processed.
    pub documents_processed: usize,
    /// Identity of each processed document, in index order.
    pub processed: Vec<DocumentRecord>,
    /// Documents excluded, with reasons (index skips plus processing failures).
    pub skipped: Vec<SkipReport>,
    /// Paths of every artifact written, in emission order.
    pub artifacts: Vec<PathBuf>,
    /// Per-page degradation events.
    pub page_issues: Vec<PageIssue>,
}

/// Run the engine without OCR support (the `avoid_ocr` default).
pub fn run(source: &Path, dest: &Path, options: &RunOptions) -> Result<RunSummary> {
    run_with_ocr(source, dest, options, &ocr::OcrDisabled)
}

/// Run the engine with an explicit OCR backend for pages lacking a text
/// layer. The backend is only consulted when `avoid_ocr` is off.
pub fn run_with_ocr(
    source: &Path,
    dest: &Path,
    options: &RunOptions,
    ocr_engine: &dyn OcrEngine,
) -> Result<RunSummary> {
    options.validate()?;
    fs::create_dir_all(dest)?;

    let index = index::load_documents(source, &options.filters)?;
    let mut summary = RunSummary {
        skipped: index.skipped,
        ..Default::default()
    };

    let reports: Vec<std::result::Result<DocReport, SkipReport>> = index
        .documents
        .par_iter()
        .map(|doc_source| {
            process_document(doc_source, dest, options, ocr_engine).map_err(|e| {
                log::error!("document {} failed: {e}", doc_source.uuid);
                SkipReport {
                    uuid: doc_source.uuid.clone(),
                    name: Some(doc_source.name.clone()),
                    reason: e.to_string(),
                }
            })
        })
        .collect();

    for report in reports {
        match report {
            Ok(report) => {
                summary.documents_processed += 1;
                summary.processed.push(report.record);
                summary.artifacts.extend(report.artifacts);
                summary.page_issues.extend(report.issues);
            }
            Err(skip) => summary.skipped.push(skip),
        }
    }
    Ok(summary)
}

struct DocReport {
    record: DocumentRecord,
    artifacts: Vec<PathBuf>,
    issues: Vec<PageIssue>,
}

fn process_document(
    source: &DocumentSource,
    dest: &Path,
    options: &RunOptions,
    ocr_engine: &dyn OcrEngine,
) -> Result<DocReport> {
    let mut issues = Vec::new();
    let doc = build_document(source, options, ocr_engine, &mut issues)?;

    let mut artifacts = Vec::new();
    let stem = doc.file_stem();

    let overlays: Vec<PageOverlay> = doc
        .pages
        .iter()
        .map(|page| {
            let mapper = PageMapper::new(page.width, page.height, page.rotation);
            render::build_overlay(page, &mapper, options.ann_type)
        })
        .collect();

    let wants_pdf = options.combined_pdf
        || options.modified_pdf
        || options.per_page_targets.contains(&PageTarget::Pdf);

    if wants_pdf && doc.is_annotated() {
        let mut composed = compose::compose(&doc, &overlays)?;

        if options.per_page_targets.contains(&PageTarget::Pdf) {
            for &idx in &doc.annotated_page_indices() {
                let path = page_artifact_path(dest, &stem, idx, PageTarget::Pdf);
                fs::create_dir_all(path.parent().unwrap_or(dest))?;
                let mut single = compose::extract_page(&composed, idx);
                compose::save_atomic(&mut single, &path)?;
                artifacts.push(path);
            }
        }

        if options.modified_pdf {
            let path = dest.join(format!("{stem}_annotated-only.pdf"));
            let mut only = composed.clone();
            compose::retain_pages(&mut only, &doc.annotated_page_indices());
            compose::save_atomic(&mut only, &path)?;
            artifacts.push(path);
        }

        if options.combined_pdf {
            let path = dest.join(format!("{stem}_annotated.pdf"));
            compose::save_atomic(&mut composed, &path)?;
            artifacts.push(path);
        }
    }

    if options.combined_md {
        if let Some(md) = markdown::document_markdown(&doc, options) {
            let md_dir = options.md_hl_output_dir.as_deref().unwrap_or(dest);
            fs::create_dir_all(md_dir)?;
            let path = md_dir.join(format!("{stem}_highlights.md"));
            write_text_atomic(&path, &md)?;
            artifacts.push(path);
        }
    }

    for &target in &options.per_page_targets {
        if target == PageTarget::Pdf {
            continue; // handled above against the composed document
        }
        for &idx in &doc.annotated_page_indices() {
            let page = &doc.pages[idx];
            let path = page_artifact_path(dest, &stem, idx, target);
            match target {
                PageTarget::Png => {
                    fs::create_dir_all(path.parent().unwrap_or(dest))?;
                    render::render_png(&overlays[idx], &path)?;
                }
                PageTarget::Svg => {
                    fs::create_dir_all(path.parent().unwrap_or(dest))?;
                    write_text_atomic(&path, &render::render_svg(&overlays[idx]))?;
                }
                PageTarget::Markdown => {
                    let Some(md) = markdown::page_markdown(&doc, page, options) else {
                        continue;
                    };
                    fs::create_dir_all(path.parent().unwrap_or(dest))?;
                    write_text_atomic(&path, &md)?;
                }
                PageTarget::Pdf => unreachable!(),
            }
            artifacts.push(path);
        }
    }

    let record = DocumentRecord {
        uuid: doc.uuid.clone(),
        name: doc.name.clone(),
        modified: doc.modified,
    };
    Ok(DocReport { record, artifacts, issues })
}

/// Decode every page of a document source into the in-memory model.
fn build_document(
    source: &DocumentSource,
    options: &RunOptions,
    ocr_engine: &dyn OcrEngine,
    issues: &mut Vec<PageIssue>,
) -> Result<Document> {
    // The source PDF is opened once per document; text-layer extraction
    // reads it page by page.
    let pdf = match (&source.source_pdf, options.ann_type.includes_highlights()) {
        (Some(path), true) => Some(LopdfDocument::load(path)?),
        _ => None,
    };
    let pdf_pages: Vec<lopdf::ObjectId> = pdf
        .as_ref()
        .map(|p| p.get_pages().into_values().collect())
        .unwrap_or_default();

    let mut pages = Vec::with_capacity(source.pages.len());
    for page_source in &source.pages {
        let strokes = decode_strokes(source, page_source, issues);
        let mapper = PageMapper::new(page_source.width, page_source.height, page_source.rotation);

        let highlights = if options.ann_type.includes_highlights() {
            extract_highlights(
                source,
                page_source,
                &strokes,
                pdf.as_ref(),
                &pdf_pages,
                &mapper,
                options,
                ocr_engine,
                issues,
            )
        } else {
            Vec::new()
        };

        pages.push(Page {
            index: page_source.index,
            uuid: page_source.uuid.clone(),
            width: page_source.width,
            height: page_source.height,
            rotation: page_source.rotation,
            strokes,
            highlights,
        });
    }

    Ok(Document {
        uuid: source.uuid.clone(),
        name: source.name.clone(),
        parent: source.parent.clone(),
        path: source.path.clone(),
        kind: source.kind,
        source_pdf: source.source_pdf.clone(),
        modified: source.modified,
        pages,
    })
}

fn decode_strokes(
    source: &DocumentSource,
    page_source: &PageSource,
    issues: &mut Vec<PageIssue>,
) -> Vec<Stroke> {
    let Some(rm_file) = &page_source.rm_file else {
        return Vec::new();
    };
    let blob = match fs::read(rm_file) {
        Ok(blob) => blob,
        Err(e) => {
            issues.push(PageIssue {
                document: source.uuid.clone(),
                page_index: page_source.index,
                detail: format!("cannot read {}: {e}", rm_file.display()),
            });
            return Vec::new();
        }
    };
    let decoded = lines::decode_page(&blob);
    if let Some(issue) = decoded.issue {
        log::warn!(
            "document {} page {}: {issue}",
            source.uuid,
            page_source.index
        );
        issues.push(PageIssue {
            document: source.uuid.clone(),
            page_index: page_source.index,
            detail: issue.to_string(),
        });
    }
    decoded.strokes
}

#[allow(clippy::too_many_arguments)]
fn extract_highlights(
    source: &DocumentSource,
    page_source: &PageSource,
    strokes: &[Stroke],
    pdf: Option<&LopdfDocument>,
    pdf_pages: &[lopdf::ObjectId],
    mapper: &PageMapper,
    options: &RunOptions,
    ocr_engine: &dyn OcrEngine,
    issues: &mut Vec<PageIssue>,
) -> Vec<crate::model::Highlight> {
    // Pre-computed records win outright when present.
    if let Some(record_file) = &page_source.highlight_file {
        match highlights::load_highlight_records(record_file, page_source.index) {
            Ok(records) => return records,
            Err(e) => {
                issues.push(PageIssue {
                    document: source.uuid.clone(),
                    page_index: page_source.index,
                    detail: format!("highlight records unreadable: {e}"),
                });
            }
        }
    }

    let marks: Vec<&Stroke> = strokes.iter().filter(|s| s.pen.is_highlighter()).collect();
    if marks.is_empty() {
        return Vec::new();
    }

    let runs = page_text_runs(
        source,
        page_source,
        strokes,
        pdf,
        pdf_pages,
        mapper,
        options,
        ocr_engine,
        issues,
    );
    highlights::derive_highlights(&marks, &runs, mapper, page_source.index)
}

/// Text runs for highlight matching: the native text layer when usable,
/// otherwise the OCR fallback (unless disabled).
#[allow(clippy::too_many_arguments)]
fn page_text_runs(
    source: &DocumentSource,
    page_source: &PageSource,
    strokes: &[Stroke],
    pdf: Option<&LopdfDocument>,
    pdf_pages: &[lopdf::ObjectId],
    mapper: &PageMapper,
    options: &RunOptions,
    ocr_engine: &dyn OcrEngine,
    issues: &mut Vec<PageIssue>,
) -> Vec<TextRun> {
    if !options.assume_malformed_pdfs {
        if let (Some(pdf), Some(&page_id)) = (pdf, pdf_pages.get(page_source.index)) {
            match textlayer::extract_text_runs(pdf, page_id) {
                Ok(runs) if !runs.is_empty() => return runs,
                Ok(_) => {}
                Err(e) => log::warn!(
                    "document {} page {}: text layer unreadable: {e}",
                    source.uuid,
                    page_source.index
                ),
            }
        }
    }

    if options.avoid_ocr || !ocr_engine.is_enabled() {
        return Vec::new();
    }

    match ocr_page(strokes, mapper, ocr_engine) {
        Ok(runs) => runs,
        Err(e) => {
            issues.push(PageIssue {
                document: source.uuid.clone(),
                page_index: page_source.index,
                detail: format!("ocr failed: {e}"),
            });
            Vec::new()
        }
    }
}

/// Rasterize the page's ink onto a white bitmap and run it through OCR.
fn ocr_page(
    strokes: &[Stroke],
    mapper: &PageMapper,
    ocr_engine: &dyn OcrEngine,
) -> Result<Vec<TextRun>> {
    let page = Page {
        index: 0,
        uuid: None,
        width: mapper.page_size().0,
        height: mapper.page_size().1,
        rotation: 0,
        strokes: strokes.to_vec(),
        highlights: Vec::new(),
    };
    let overlay = render::build_overlay(&page, mapper, crate::config::AnnotationKind::Scribbles);

    let tmp = tempfile::Builder::new().suffix(".png").tempfile()?;
    render::render_png(&overlay, tmp.path())?;

    let words = ocr_engine.recognize(tmp.path())?;
    let image_height_px = overlay.page_height * render::RASTER_PX_PER_PT;
    Ok(ocr::words_to_runs(&words, image_height_px, render::RASTER_PX_PER_PT))
}

fn page_artifact_path(dest: &Path, stem: &str, index: usize, target: PageTarget) -> PathBuf {
    dest.join(stem)
        .join(format!("page-{}.{}", index + 1, target.extension()))
}

/// Persist a text artifact atomically, same contract as PDF saving.
fn write_text_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.persist(path).map_err(|e| Error::OutputWriteFailure {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(())
}
