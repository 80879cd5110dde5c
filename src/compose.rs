//! PDF composition.
//!
//! Overlays are appended to page content streams rather than drawn into
//! them: the original content is bracketed in `q`/`Q` first so a page that
//! leaves its graphics state dirty cannot displace the annotations. Pages
//! with an empty overlay are left byte-untouched.

use std::io::Write;
use std::path::Path;

use lopdf::{dictionary, Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::model::Document;
use crate::render::overlay::{content_stream, GsRegistry};
use crate::render::PageOverlay;

/// Build the annotated PDF for a document: the source PDF (or synthesized
/// blank pages for notebooks) with each page's overlay appended.
///
/// `overlays` is indexed by page position and must cover every page.
pub fn compose(doc: &Document, overlays: &[PageOverlay]) -> Result<LopdfDocument> {
    let mut pdf = match &doc.source_pdf {
        Some(path) => LopdfDocument::load(path)?,
        None => blank_document(doc),
    };

    let pages: Vec<(u32, ObjectId)> = pdf.get_pages().into_iter().collect();
    for (page_no, page_id) in pages {
        let idx = (page_no - 1) as usize;
        let Some(overlay) = overlays.get(idx) else {
            continue;
        };
        if overlay.is_empty() {
            continue;
        }
        apply_overlay(&mut pdf, page_id, overlay)?;
    }
    Ok(pdf)
}

/// Synthesize a PDF skeleton for a notebook: one empty page per model page,
/// sized from the page geometry.
pub fn blank_document(doc: &Document) -> LopdfDocument {
    let mut pdf = LopdfDocument::with_version("1.5");
    let pages_id = pdf.new_object_id();

    let kids: Vec<Object> = doc
        .pages
        .iter()
        .map(|page| {
            let content_id = pdf.add_object(Stream::new(dictionary! {}, Vec::new()));
            let page_id = pdf.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    0.into(),
                    0.into(),
                    Object::Real(page.width),
                    Object::Real(page.height),
                ],
                "Contents" => content_id,
            });
            Object::Reference(page_id)
        })
        .collect();

    let count = kids.len() as i64;
    pdf.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = pdf.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    pdf.trailer.set("Root", catalog_id);
    pdf
}

/// Append one page's overlay: wrap the existing content in `q`/`Q`, add the
/// overlay stream after it, and install the ExtGState resources the stream
/// references.
fn apply_overlay(pdf: &mut LopdfDocument, page_id: ObjectId, overlay: &PageOverlay) -> Result<()> {
    let mut gs = GsRegistry::new();
    let stream = content_stream(overlay, &mut gs);

    let original = pdf.get_page_contents(page_id);

    let pre_id = pdf.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
    let mut tail = b"Q\n".to_vec();
    tail.extend_from_slice(&stream);
    let post_id = pdf.add_object(Stream::new(dictionary! {}, tail));

    let mut contents: Vec<Object> = vec![Object::Reference(pre_id)];
    contents.extend(original.into_iter().map(Object::Reference));
    contents.push(Object::Reference(post_id));

    if !gs.is_empty() {
        install_ext_gstate(pdf, page_id, &gs.entries())?;
    }

    let page = pdf.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}

/// Merge alpha ExtGState entries into the page's resources. The resolved
/// resource dictionary is re-attached inline so a shared (referenced)
/// dictionary is never mutated for other pages.
fn install_ext_gstate(
    pdf: &mut LopdfDocument,
    page_id: ObjectId,
    entries: &[(String, f32)],
) -> Result<()> {
    let mut resources = {
        let page = pdf.get_dictionary(page_id)?;
        match page.get(b"Resources") {
            Ok(Object::Reference(id)) => pdf.get_dictionary(*id)?.clone(),
            Ok(Object::Dictionary(d)) => d.clone(),
            _ => Dictionary::new(),
        }
    };

    let mut ext = match resources.get(b"ExtGState") {
        Ok(Object::Dictionary(d)) => d.clone(),
        Ok(Object::Reference(id)) => pdf.get_dictionary(*id)?.clone(),
        _ => Dictionary::new(),
    };
    for (name, alpha) in entries {
        ext.set(
            name.as_bytes().to_vec(),
            dictionary! {
                "Type" => "ExtGState",
                "ca" => Object::Real(*alpha),
                "CA" => Object::Real(*alpha),
            },
        );
    }
    resources.set("ExtGState", Object::Dictionary(ext));

    let page = pdf.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Drop every page whose (0-based) index is not in `keep`. Page order among
/// kept pages is preserved.
pub fn retain_pages(pdf: &mut LopdfDocument, keep: &[usize]) {
    let delete: Vec<u32> = pdf
        .get_pages()
        .keys()
        .filter(|&&page_no| !keep.contains(&((page_no - 1) as usize)))
        .copied()
        .collect();
    if !delete.is_empty() {
        pdf.delete_pages(&delete);
    }
}

/// Clone out a single page as its own document.
pub fn extract_page(pdf: &LopdfDocument, index: usize) -> LopdfDocument {
    let mut single = pdf.clone();
    retain_pages(&mut single, &[index]);
    single
}

/// Persist a composed PDF atomically: write to a temporary file in the
/// destination directory, then rename over the target. A failed document
/// never leaves a truncated file behind.
pub fn save_atomic(pdf: &mut LopdfDocument, dest: &Path) -> Result<()> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    pdf.save_to(&mut tmp)
        .map_err(|e| Error::OutputWriteFailure {
            path: dest.to_path_buf(),
            reason: e.to_string(),
        })?;
    tmp.flush()?;
    tmp.persist(dest).map_err(|e| Error::OutputWriteFailure {
        path: dest.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(())
}
