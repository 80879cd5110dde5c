//! Export-tree scanning and document source construction.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use lopdf::Document as LopdfDocument;

use crate::config::DocumentFilters;
use crate::error::{Error, Result};
use crate::geometry::device_page_size_pts;
use crate::model::SourceKind;

use super::manifest::{ContentFile, MetadataFile};

/// Everything needed to decode one page: its on-disk companions and the
/// destination geometry the coordinate mapper will target.
#[derive(Debug, Clone)]
pub struct PageSource {
    /// Zero-based page index.
    pub index: usize,
    /// Device page identifier, when the manifest carries one.
    pub uuid: Option<String>,
    /// Binary annotation blob for this page, if it exists.
    pub rm_file: Option<PathBuf>,
    /// Pre-computed highlight record file, if it exists.
    pub highlight_file: Option<PathBuf>,
    /// Destination page width in points.
    pub width: f32,
    /// Destination page height in points.
    pub height: f32,
    /// Destination page rotation in degrees.
    pub rotation: u16,
}

/// One matched document: identity plus the page sources to decode.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    pub uuid: String,
    pub name: String,
    pub parent: String,
    pub path: String,
    pub kind: SourceKind,
    pub source_pdf: Option<PathBuf>,
    pub modified: Option<DateTime<Utc>>,
    pub pages: Vec<PageSource>,
}

/// A document excluded from the run, with the reason.
#[derive(Debug, Clone)]
pub struct SkipReport {
    pub uuid: String,
    pub name: Option<String>,
    pub reason: String,
}

/// Result of indexing an export tree.
#[derive(Debug, Default)]
pub struct IndexResult {
    /// Matched documents, ordered by uuid for deterministic runs.
    pub documents: Vec<DocumentSource>,
    /// Documents excluded because a companion file was missing or unreadable.
    pub skipped: Vec<SkipReport>,
}

/// Scan `root` and build one [`DocumentSource`] per identifier that passes
/// the filters. Companion-file failures become [`SkipReport`]s, never hard
/// errors; only an unreadable root directory fails the call.
pub fn load_documents(root: &Path, filters: &DocumentFilters) -> Result<IndexResult> {
    let mut manifests: BTreeMap<String, MetadataFile> = BTreeMap::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("metadata") {
            continue;
        }
        let Some(uuid) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match read_json::<MetadataFile>(&path) {
            Ok(meta) => {
                manifests.insert(uuid.to_string(), meta);
            }
            Err(e) => {
                log::warn!("skipping unreadable metadata {}: {e}", path.display());
            }
        }
    }

    let mut result = IndexResult::default();

    for (uuid, meta) in &manifests {
        if !meta.is_live_document() {
            continue;
        }
        let folder_path = resolve_path(&manifests, &meta.parent);
        if !filters.matches(&meta.visible_name, uuid, &folder_path) {
            continue;
        }

        match build_source(root, uuid, meta, folder_path) {
            Ok(source) => result.documents.push(source),
            Err(e) => {
                log::warn!("excluding document {uuid}: {e}");
                result.skipped.push(SkipReport {
                    uuid: uuid.clone(),
                    name: Some(meta.visible_name.clone()),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(result)
}

/// Resolve the display path of an entry by walking the folder chain.
fn resolve_path(manifests: &BTreeMap<String, MetadataFile>, parent: &str) -> String {
    let mut segments = Vec::new();
    let mut current = parent;
    // Cycle guard: device trees are shallow, anything deeper is corrupt.
    for _ in 0..64 {
        if current.is_empty() || current == "trash" {
            break;
        }
        match manifests.get(current) {
            Some(folder) if folder.is_folder() => {
                segments.push(folder.visible_name.clone());
                current = &folder.parent;
            }
            _ => break,
        }
    }
    segments.reverse();
    format!("/{}", segments.join("/"))
}

fn build_source(
    root: &Path,
    uuid: &str,
    meta: &MetadataFile,
    folder_path: String,
) -> Result<DocumentSource> {
    let content_path = root.join(format!("{uuid}.content"));
    if !content_path.is_file() {
        return Err(Error::MissingSourceFile {
            uuid: uuid.to_string(),
            path: content_path,
        });
    }
    let content: ContentFile = read_json(&content_path)?;

    let (kind, source_pdf) = if content.is_pdf_backed() {
        let pdf_path = root.join(format!("{uuid}.pdf"));
        if pdf_path.is_file() {
            (SourceKind::Pdf, Some(pdf_path))
        } else {
            // Degraded, not fatal: the document keeps no source reference and
            // pages fall back to device-native geometry.
            log::warn!(
                "document {uuid} ({}) expects a source PDF but none is present",
                meta.visible_name
            );
            (SourceKind::Pdf, None)
        }
    } else {
        (SourceKind::Notebook, None)
    };

    let page_uuids = manifest_page_ids(root, uuid, &content);
    let pages = build_pages(root, uuid, page_uuids, source_pdf.as_deref())?;

    Ok(DocumentSource {
        uuid: uuid.to_string(),
        name: meta.visible_name.clone(),
        parent: meta.parent.clone(),
        path: folder_path,
        kind,
        source_pdf,
        modified: meta.modified(),
        pages,
    })
}

/// Page ids from the manifest, falling back to enumerating `<uuid>/*.rm`
/// (old firmware names annotation files by page index).
fn manifest_page_ids(root: &Path, uuid: &str, content: &ContentFile) -> Vec<String> {
    if !content.pages.is_empty() {
        return content.pages.clone();
    }

    let page_dir = root.join(uuid);
    let Ok(entries) = fs::read_dir(&page_dir) else {
        return Vec::new();
    };
    let mut stems: Vec<(u32, String)> = entries
        .flatten()
        .filter_map(|e| {
            let path = e.path();
            if path.extension().and_then(|x| x.to_str()) != Some("rm") {
                return None;
            }
            let stem = path.file_stem()?.to_str()?.to_string();
            let index: u32 = stem.parse().ok()?;
            Some((index, stem))
        })
        .collect();
    stems.sort_by_key(|(i, _)| *i);
    stems.into_iter().map(|(_, s)| s).collect()
}

/// Build page sources, reconciling the manifest page list against the source
/// PDF. The PDF page count is authoritative: extra manifest ids are dropped
/// with a warning, missing ones are padded so indices stay contiguous.
fn build_pages(
    root: &Path,
    uuid: &str,
    mut page_uuids: Vec<String>,
    source_pdf: Option<&Path>,
) -> Result<Vec<PageSource>> {
    let (default_w, default_h) = device_page_size_pts();

    let pdf_geometry: Option<Vec<(f32, f32, u16)>> = match source_pdf {
        Some(path) => match load_pdf_geometry(path) {
            Ok(geometry) => Some(geometry),
            Err(e) => {
                log::warn!("cannot read geometry of {}: {e}", path.display());
                None
            }
        },
        None => None,
    };

    let page_count = match &pdf_geometry {
        Some(geometry) => {
            if page_uuids.len() > geometry.len() {
                log::warn!(
                    "document {uuid}: manifest lists {} pages but the source PDF has {}; \
                     dropping the extras",
                    page_uuids.len(),
                    geometry.len()
                );
                page_uuids.truncate(geometry.len());
            }
            geometry.len()
        }
        None => page_uuids.len(),
    };

    let page_dir = root.join(uuid);
    let highlight_dir = root.join(format!("{uuid}.highlights"));

    let mut pages = Vec::with_capacity(page_count);
    for index in 0..page_count {
        let page_uuid = page_uuids.get(index).cloned();
        let rm_file = page_uuid
            .as_deref()
            .map(|p| page_dir.join(format!("{p}.rm")))
            .filter(|p| p.is_file())
            .or_else(|| {
                let by_index = page_dir.join(format!("{index}.rm"));
                by_index.is_file().then_some(by_index)
            });
        let highlight_file = page_uuid
            .as_deref()
            .map(|p| highlight_dir.join(format!("{p}.json")))
            .filter(|p| p.is_file());

        let (width, height, rotation) = match &pdf_geometry {
            Some(geometry) => geometry[index],
            None => (default_w, default_h, 0),
        };

        pages.push(PageSource {
            index,
            uuid: page_uuid,
            rm_file,
            highlight_file,
            width,
            height,
            rotation,
        });
    }
    Ok(pages)
}

/// Per-page (width, height, rotation) from a source PDF.
fn load_pdf_geometry(path: &Path) -> Result<Vec<(f32, f32, u16)>> {
    let doc = LopdfDocument::load(path)?;
    let pages = doc.get_pages();
    let mut geometry = Vec::with_capacity(pages.len());
    for (_num, page_id) in pages {
        let mut size = (612.0, 792.0);
        let mut rotation = 0u16;
        if let Ok(dict) = doc.get_dictionary(page_id) {
            if let Ok(media_box) = dict.get(b"MediaBox") {
                if let Ok(array) = media_box.as_array() {
                    if array.len() >= 4 {
                        let x0 = array[0].as_float().unwrap_or(0.0);
                        let y0 = array[1].as_float().unwrap_or(0.0);
                        let x1 = array[2].as_float().unwrap_or(612.0);
                        let y1 = array[3].as_float().unwrap_or(792.0);
                        size = ((x1 - x0).abs(), (y1 - y0).abs());
                    }
                }
            }
            if let Ok(rotate) = dict.get(b"Rotate") {
                if let Ok(r) = rotate.as_i64() {
                    rotation = r.rem_euclid(360) as u16;
                }
            }
        }
        geometry.push((size.0, size.1, rotation));
    }
    Ok(geometry)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn seed_notebook(root: &Path, uuid: &str, name: &str, parent: &str) {
        write(
            &root.join(format!("{uuid}.metadata")),
            &format!(
                r#"{{"visibleName":"{name}","parent":"{parent}","type":"DocumentType"}}"#
            ),
        );
        write(
            &root.join(format!("{uuid}.content")),
            r#"{"fileType":"notebook","pages":["pg-1","pg-2"]}"#,
        );
    }

    #[test]
    fn test_load_filters_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        seed_notebook(root, "bbb", "Beta", "");
        seed_notebook(root, "aaa", "Alpha", "");

        let result = load_documents(root, &DocumentFilters::default()).unwrap();
        let names: Vec<_> = result.documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"], "ordered by uuid");

        let filters = DocumentFilters {
            uuid: Some("bbb".into()),
            ..Default::default()
        };
        let result = load_documents(root, &filters).unwrap();
        assert_eq!(result.documents.len(), 1);
        assert_eq!(result.documents[0].uuid, "bbb");
    }

    #[test]
    fn test_missing_content_excludes_with_report() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            &root.join("orphan.metadata"),
            r#"{"visibleName":"Orphan","type":"DocumentType"}"#,
        );

        let result = load_documents(root, &DocumentFilters::default()).unwrap();
        assert!(result.documents.is_empty());
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].uuid, "orphan");
        assert!(result.skipped[0].reason.contains("Missing source file"));
    }

    #[test]
    fn test_folder_path_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            &root.join("f1.metadata"),
            r#"{"visibleName":"research","type":"CollectionType"}"#,
        );
        write(
            &root.join("f2.metadata"),
            r#"{"visibleName":"2024","parent":"f1","type":"CollectionType"}"#,
        );
        seed_notebook(root, "doc1", "Paper notes", "f2");

        let filters = DocumentFilters {
            path: Some("research/2024".into()),
            ..Default::default()
        };
        let result = load_documents(root, &filters).unwrap();
        assert_eq!(result.documents.len(), 1);
        assert_eq!(result.documents[0].path, "/research/2024");
    }

    #[test]
    fn test_missing_pdf_degrades_to_device_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            &root.join("d.metadata"),
            r#"{"visibleName":"Scan","type":"DocumentType"}"#,
        );
        write(
            &root.join("d.content"),
            r#"{"fileType":"pdf","pages":["p1"]}"#,
        );

        let result = load_documents(root, &DocumentFilters::default()).unwrap();
        let doc = &result.documents[0];
        assert_eq!(doc.kind, SourceKind::Pdf);
        assert!(doc.source_pdf.is_none());
        let (w, h) = device_page_size_pts();
        assert_eq!(doc.pages[0].width, w);
        assert_eq!(doc.pages[0].height, h);
    }

    #[test]
    fn test_trashed_documents_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        seed_notebook(root, "gone", "Gone", "trash");
        let result = load_documents(root, &DocumentFilters::default()).unwrap();
        assert!(result.documents.is_empty());
        assert!(result.skipped.is_empty());
    }
}
