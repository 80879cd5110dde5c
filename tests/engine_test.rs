//! End-to-end engine tests over synthetic export trees.

use std::fs;
use std::path::Path;

use lopdf::{dictionary, Document as LopdfDocument, Object, Stream};

use inkmerge::{DocumentFilters, HighlightLayout, PageTarget, RunOptions};

// ---------------------------------------------------------------- fixtures

/// Build a PDF whose pages each show the given text at (100, 700) in a
/// 24pt font, and save it to `path`.
fn write_source_pdf(path: &Path, page_texts: &[&str]) {
    let mut doc = LopdfDocument::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let kids: Vec<Object> = page_texts
        .iter()
        .map(|text| {
            let content = format!("BT\n/F1 24 Tf\n100 700 Td\n({text}) Tj\nET\n");
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => resources_id,
                "Contents" => content_id,
            });
            Object::Reference(page_id)
        })
        .collect();

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

fn push_i32(buf: &mut Vec<u8>, v: i32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_f32(buf: &mut Vec<u8>, v: f32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Encode a version-5 annotation blob with one layer of the given strokes.
/// Each stroke is `(pen_code, points)` with 2pt-wide lines of width 30.
fn encode_rm_v5(strokes: &[(i32, Vec<(f32, f32)>)]) -> Vec<u8> {
    let mut buf = format!("{:<43}", "reMarkable .lines file, version=5").into_bytes();
    push_i32(&mut buf, 1); // layers
    push_i32(&mut buf, strokes.len() as i32);
    for (pen, points) in strokes {
        push_i32(&mut buf, *pen);
        push_i32(&mut buf, 0); // color
        push_i32(&mut buf, 0); // padding
        push_f32(&mut buf, 30.0); // width
        push_f32(&mut buf, 0.0); // v5 extra field
        push_i32(&mut buf, points.len() as i32);
        for &(x, y) in points {
            push_f32(&mut buf, x);
            push_f32(&mut buf, y);
            push_f32(&mut buf, 0.0); // speed
            push_f32(&mut buf, 0.0); // tilt
            push_f32(&mut buf, 2.0); // width
            push_f32(&mut buf, 1.0); // pressure
        }
    }
    buf
}

const PEN_BALLPOINT: i32 = 2;
const PEN_HIGHLIGHTER: i32 = 5;

struct TreeBuilder {
    root: std::path::PathBuf,
}

impl TreeBuilder {
    fn new(root: &Path) -> Self {
        Self { root: root.to_path_buf() }
    }

    fn pdf_document(&self, uuid: &str, name: &str, page_texts: &[&str]) -> &Self {
        let page_ids: Vec<String> = (0..page_texts.len()).map(|i| format!("pg-{i}")).collect();
        fs::write(
            self.root.join(format!("{uuid}.metadata")),
            format!(r#"{{"visibleName":"{name}","parent":"","type":"DocumentType"}}"#),
        )
        .unwrap();
        fs::write(
            self.root.join(format!("{uuid}.content")),
            serde_json::json!({ "fileType": "pdf", "pages": page_ids }).to_string(),
        )
        .unwrap();
        write_source_pdf(&self.root.join(format!("{uuid}.pdf")), page_texts);
        self
    }

    fn notebook(&self, uuid: &str, name: &str, page_count: usize) -> &Self {
        let page_ids: Vec<String> = (0..page_count).map(|i| format!("pg-{i}")).collect();
        fs::write(
            self.root.join(format!("{uuid}.metadata")),
            format!(r#"{{"visibleName":"{name}","parent":"","type":"DocumentType"}}"#),
        )
        .unwrap();
        fs::write(
            self.root.join(format!("{uuid}.content")),
            serde_json::json!({ "fileType": "notebook", "pages": page_ids }).to_string(),
        )
        .unwrap();
        self
    }

    fn rm_blob(&self, uuid: &str, page: usize, blob: &[u8]) -> &Self {
        let dir = self.root.join(uuid);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("pg-{page}.rm")), blob).unwrap();
        self
    }

    fn highlight_records(&self, uuid: &str, page: usize, json: &str) -> &Self {
        let dir = self.root.join(format!("{uuid}.highlights"));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("pg-{page}.json")), json).unwrap();
        self
    }
}

/// A highlighter stroke across the "Hello world" text block on a 612x792
/// page (device coordinates, chosen so the run is majority-covered).
fn mark_over_text() -> (i32, Vec<(f32, f32)>) {
    (PEN_HIGHLIGHTER, vec![(200.0, 190.0), (540.0, 210.0)])
}

fn ink_scribble() -> (i32, Vec<(f32, f32)>) {
    (PEN_BALLPOINT, vec![(100.0, 400.0), (600.0, 900.0)])
}

// ------------------------------------------------------------------- tests

#[test]
fn combined_pdf_preserves_page_count() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let tree = TreeBuilder::new(src.path());
    tree.pdf_document("doc1", "Paper", &["Hello world", "Second page"])
        .rm_blob("doc1", 0, &encode_rm_v5(&[ink_scribble()]));

    let summary = inkmerge::run(src.path(), out.path(), &RunOptions::default()).unwrap();
    assert_eq!(summary.documents_processed, 1);
    assert!(summary.page_issues.is_empty());

    let combined = out.path().join("Paper_annotated.pdf");
    assert!(combined.is_file());
    let loaded = LopdfDocument::load(&combined).unwrap();
    assert_eq!(loaded.get_pages().len(), 2);
}

#[test]
fn annotated_only_pdf_keeps_marked_pages() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let tree = TreeBuilder::new(src.path());
    tree.pdf_document("doc1", "Paper", &["one", "two", "three"])
        .rm_blob("doc1", 1, &encode_rm_v5(&[ink_scribble()]));

    let options = RunOptions::default()
        .with_combined_pdf(false)
        .with_combined_md(false)
        .with_modified_pdf(true);
    inkmerge::run(src.path(), out.path(), &options).unwrap();

    let only = out.path().join("Paper_annotated-only.pdf");
    let loaded = LopdfDocument::load(&only).unwrap();
    assert_eq!(loaded.get_pages().len(), 1);
    assert!(!out.path().join("Paper_annotated.pdf").exists());
}

#[test]
fn highlight_text_lands_in_markdown() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let tree = TreeBuilder::new(src.path());
    tree.pdf_document("doc1", "Reading", &["cover", "Hello world", "back"])
        .rm_blob("doc1", 1, &encode_rm_v5(&[mark_over_text()]));

    let options = RunOptions::default()
        .with_hl_format(HighlightLayout::BulletPoints)
        .with_page_offset(1);
    inkmerge::run(src.path(), out.path(), &options).unwrap();

    let md = fs::read_to_string(out.path().join("Reading_highlights.md")).unwrap();
    assert!(md.contains("# Reading"));
    assert!(md.contains("## Page 3"), "offset shifts displayed number");
    assert!(md.contains("- Hello world"));
    assert_eq!(md.matches("## Page").count(), 1, "unmarked pages get no section");
}

#[test]
fn precomputed_records_win_over_derivation() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let tree = TreeBuilder::new(src.path());
    tree.pdf_document("doc1", "Reading", &["Hello world"])
        .rm_blob("doc1", 0, &encode_rm_v5(&[mark_over_text()]))
        .highlight_records(
            "doc1",
            0,
            r#"{"highlights":[[{"text":"trusted span","color":0,
                "rects":[{"x":200,"y":185,"width":340,"height":30}]}]]}"#,
        );

    inkmerge::run(src.path(), out.path(), &RunOptions::default()).unwrap();
    let md = fs::read_to_string(out.path().join("Reading_highlights.md")).unwrap();
    assert!(md.contains("trusted span"));
    assert!(!md.contains("Hello world"));
}

#[test]
fn reruns_are_byte_identical() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let tree = TreeBuilder::new(src.path());
    tree.pdf_document("doc1", "Paper", &["Hello world"])
        .rm_blob(
            "doc1",
            0,
            &encode_rm_v5(&[ink_scribble(), mark_over_text()]),
        );

    let options = RunOptions::default();
    inkmerge::run(src.path(), out.path(), &options).unwrap();
    let pdf_first = fs::read(out.path().join("Paper_annotated.pdf")).unwrap();
    let md_first = fs::read(out.path().join("Paper_highlights.md")).unwrap();

    inkmerge::run(src.path(), out.path(), &options).unwrap();
    assert_eq!(pdf_first, fs::read(out.path().join("Paper_annotated.pdf")).unwrap());
    assert_eq!(md_first, fs::read(out.path().join("Paper_highlights.md")).unwrap());
}

#[test]
fn run_summary_records_processed_documents() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let tree = TreeBuilder::new(src.path());
    tree.pdf_document("doc1", "Paper", &["Hello world"])
        .rm_blob("doc1", 0, &encode_rm_v5(&[ink_scribble()]));
    // Manifest with a device timestamp (epoch ms).
    fs::write(
        src.path().join("doc1.metadata"),
        r#"{"visibleName":"Paper","parent":"","type":"DocumentType","lastModified":"1700000000000"}"#,
    )
    .unwrap();

    let summary = inkmerge::run(src.path(), out.path(), &RunOptions::default()).unwrap();
    assert_eq!(summary.processed.len(), 1);
    let record = &summary.processed[0];
    assert_eq!(record.uuid, "doc1");
    assert_eq!(record.name, "Paper");
    assert!(record.modified.is_some());
}

#[test]
fn uuid_filter_isolates_one_document() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let tree = TreeBuilder::new(src.path());
    tree.pdf_document("aaa", "Alpha", &["a"])
        .rm_blob("aaa", 0, &encode_rm_v5(&[ink_scribble()]));
    tree.pdf_document("bbb", "Beta", &["b"])
        .rm_blob("bbb", 0, &encode_rm_v5(&[ink_scribble()]));

    let options = RunOptions::default().with_filters(DocumentFilters {
        uuid: Some("bbb".into()),
        ..Default::default()
    });
    let summary = inkmerge::run(src.path(), out.path(), &options).unwrap();
    assert_eq!(summary.documents_processed, 1);
    assert!(out.path().join("Beta_annotated.pdf").is_file());
    assert!(!out.path().join("Alpha_annotated.pdf").exists());
}

#[test]
fn unknown_blob_version_degrades_once() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let tree = TreeBuilder::new(src.path());
    tree.pdf_document("doc1", "Paper", &["Hello world"]);

    let mut blob = format!("{:<43}", "reMarkable .lines file, version=9").into_bytes();
    push_i32(&mut blob, 0);
    tree.rm_blob("doc1", 0, &blob);

    let summary = inkmerge::run(src.path(), out.path(), &RunOptions::default()).unwrap();
    assert_eq!(summary.documents_processed, 1);
    assert_eq!(summary.page_issues.len(), 1);
    assert_eq!(summary.page_issues[0].page_index, 0);
    assert!(summary.page_issues[0].detail.contains("version"));
    // Nothing annotated, so no PDF artifact either.
    assert!(!out.path().join("Paper_annotated.pdf").exists());
}

#[test]
fn notebook_marks_without_ocr_render_but_carry_no_text() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let tree = TreeBuilder::new(src.path());
    tree.notebook("nb1", "Field Notes", 1)
        .rm_blob("nb1", 0, &encode_rm_v5(&[mark_over_text()]));

    let summary = inkmerge::run(src.path(), out.path(), &RunOptions::default()).unwrap();
    assert_eq!(summary.documents_processed, 1);

    // Marks still produce an annotated PDF page.
    let combined = out.path().join("Field Notes_annotated.pdf");
    assert!(combined.is_file());
    // But no Markdown, since no text could be matched.
    assert!(!out.path().join("Field Notes_highlights.md").exists());
}

#[test]
fn avoid_ocr_never_consults_the_engine() {
    struct MustNotRun;
    impl inkmerge::OcrEngine for MustNotRun {
        fn recognize(&self, _: &Path) -> inkmerge::Result<Vec<inkmerge::OcrWord>> {
            panic!("ocr must not be invoked when avoid_ocr is set");
        }
    }

    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let tree = TreeBuilder::new(src.path());
    tree.notebook("nb1", "Field Notes", 1)
        .rm_blob("nb1", 0, &encode_rm_v5(&[mark_over_text()]));

    // avoid_ocr defaults to true, so the backend stays untouched even though
    // the page has marks and no text layer.
    let summary =
        inkmerge::run_with_ocr(src.path(), out.path(), &RunOptions::default(), &MustNotRun)
            .unwrap();
    assert_eq!(summary.documents_processed, 1);
}

#[test]
fn per_page_artifacts_cover_annotated_pages_only() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let tree = TreeBuilder::new(src.path());
    tree.pdf_document("doc1", "Paper", &["Hello world", "plain page"])
        .rm_blob(
            "doc1",
            0,
            &encode_rm_v5(&[ink_scribble(), mark_over_text()]),
        );

    let options = RunOptions::default()
        .with_combined_pdf(false)
        .with_combined_md(false)
        .with_page_targets(vec![
            PageTarget::Png,
            PageTarget::Svg,
            PageTarget::Markdown,
            PageTarget::Pdf,
        ]);
    inkmerge::run(src.path(), out.path(), &options).unwrap();

    let page_dir = out.path().join("Paper");
    assert!(page_dir.join("page-1.png").is_file());
    assert!(page_dir.join("page-1.svg").is_file());
    assert!(page_dir.join("page-1.md").is_file());
    assert!(page_dir.join("page-1.pdf").is_file());
    assert!(!page_dir.join("page-2.png").exists());

    let svg = fs::read_to_string(page_dir.join("page-1.svg")).unwrap();
    assert!(svg.contains("<polyline"));
    let single = LopdfDocument::load(page_dir.join("page-1.pdf")).unwrap();
    assert_eq!(single.get_pages().len(), 1);
}

#[test]
fn markdown_output_dir_override() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let md_out = tempfile::tempdir().unwrap();
    let tree = TreeBuilder::new(src.path());
    tree.pdf_document("doc1", "Reading", &["Hello world"])
        .rm_blob("doc1", 0, &encode_rm_v5(&[mark_over_text()]));

    let options = RunOptions::default().with_hl_output_dir(md_out.path());
    inkmerge::run(src.path(), out.path(), &options).unwrap();

    assert!(md_out.path().join("Reading_highlights.md").is_file());
    assert!(!out.path().join("Reading_highlights.md").exists());
}

#[test]
fn invalid_options_fail_before_any_output() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    TreeBuilder::new(src.path()).pdf_document("doc1", "Paper", &["x"]);

    let options = RunOptions::default()
        .with_combined_pdf(false)
        .with_combined_md(false);
    assert!(inkmerge::run(src.path(), out.path(), &options).is_err());
}
