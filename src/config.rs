//! Run configuration and validation.
//!
//! [`RunOptions`] is the complete contract between callers (the CLI, tests,
//! embedding applications) and the engine. Every component entry point takes
//! the relevant slice of it explicitly; there is no global state.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Which annotation kinds a run should handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnnotationKind {
    /// Handle both ink strokes and highlights.
    #[default]
    Both,
    /// Ink strokes only.
    Scribbles,
    /// Highlights only.
    Highlights,
}

impl AnnotationKind {
    /// Whether ink strokes should be rendered.
    pub fn includes_scribbles(self) -> bool {
        matches!(self, AnnotationKind::Both | AnnotationKind::Scribbles)
    }

    /// Whether highlights should be extracted and rendered.
    pub fn includes_highlights(self) -> bool {
        matches!(self, AnnotationKind::Both | AnnotationKind::Highlights)
    }
}

/// Layout for highlighted text in Markdown output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HighlightLayout {
    /// All of a page's highlight texts fused into one block.
    #[default]
    WholeBlock,
    /// One bullet per highlight.
    BulletPoints,
}

/// Markdown header style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderStyle {
    /// `#`-prefixed headers.
    #[default]
    Atx,
    /// Underlined headers.
    Setext,
}

/// Per-page artifact formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageTarget {
    /// Page-scoped Markdown excerpt.
    Markdown,
    /// Single-page PDF with overlays.
    Pdf,
    /// Raster image of the page overlay.
    Png,
    /// Vector image of the page overlay.
    Svg,
}

impl PageTarget {
    /// Parse a target from its file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "md" => Some(PageTarget::Markdown),
            "pdf" => Some(PageTarget::Pdf),
            "png" => Some(PageTarget::Png),
            "svg" => Some(PageTarget::Svg),
            _ => None,
        }
    }

    /// File extension for this target.
    pub fn extension(self) -> &'static str {
        match self {
            PageTarget::Markdown => "md",
            PageTarget::Pdf => "pdf",
            PageTarget::Png => "png",
            PageTarget::Svg => "svg",
        }
    }
}

/// Document filters applied by the index loader. Filters are ANDed; an
/// absent filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilters {
    /// Substring match on the document's display name.
    pub name: Option<String>,
    /// Exact match on the document identifier.
    pub uuid: Option<String>,
    /// Substring match on the document's resolved folder path.
    pub path: Option<String>,
}

impl DocumentFilters {
    /// True when a document with the given attributes passes all filters.
    pub fn matches(&self, name: &str, uuid: &str, path: &str) -> bool {
        if let Some(ref n) = self.name {
            if !name.contains(n.as_str()) {
                return false;
            }
        }
        if let Some(ref u) = self.uuid {
            if uuid != u {
                return false;
            }
        }
        if let Some(ref p) = self.path {
            if !path.contains(p.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Options controlling a full engine run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Which annotation kinds to handle.
    pub ann_type: AnnotationKind,

    /// Emit the all-pages merged annotated PDF.
    pub combined_pdf: bool,

    /// Emit the consolidated highlights Markdown file.
    pub combined_md: bool,

    /// Emit the annotated-pages-only PDF.
    pub modified_pdf: bool,

    /// Highlight layout in Markdown output.
    pub md_hl_format: HighlightLayout,

    /// Destination override for Markdown output.
    pub md_hl_output_dir: Option<PathBuf>,

    /// Integer added to displayed page numbers in Markdown headers.
    pub md_page_offset: i32,

    /// Markdown header style.
    pub md_header_format: HeaderStyle,

    /// Apply the Obsidian-oriented header template (requires ATX headers).
    pub md_obsidian_format: bool,

    /// Requested per-page artifact formats (empty means none).
    pub per_page_targets: Vec<PageTarget>,

    /// Force the OCR fallback path even when a text layer exists.
    pub assume_malformed_pdfs: bool,

    /// Disable the OCR fallback entirely.
    pub avoid_ocr: bool,

    /// Document filters.
    pub filters: DocumentFilters,
}

impl RunOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict processing to one annotation kind.
    pub fn with_ann_type(mut self, kind: AnnotationKind) -> Self {
        self.ann_type = kind;
        self
    }

    /// Toggle the combined annotated PDF.
    pub fn with_combined_pdf(mut self, on: bool) -> Self {
        self.combined_pdf = on;
        self
    }

    /// Toggle the consolidated Markdown file.
    pub fn with_combined_md(mut self, on: bool) -> Self {
        self.combined_md = on;
        self
    }

    /// Toggle the annotated-pages-only PDF.
    pub fn with_modified_pdf(mut self, on: bool) -> Self {
        self.modified_pdf = on;
        self
    }

    /// Set the Markdown highlight layout.
    pub fn with_hl_format(mut self, layout: HighlightLayout) -> Self {
        self.md_hl_format = layout;
        self
    }

    /// Override the Markdown output directory.
    pub fn with_hl_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.md_hl_output_dir = Some(dir.into());
        self
    }

    /// Offset displayed page numbers.
    pub fn with_page_offset(mut self, offset: i32) -> Self {
        self.md_page_offset = offset;
        self
    }

    /// Set the Markdown header style.
    pub fn with_header_format(mut self, style: HeaderStyle) -> Self {
        self.md_header_format = style;
        self
    }

    /// Toggle the Obsidian header template.
    pub fn with_obsidian_format(mut self, on: bool) -> Self {
        self.md_obsidian_format = on;
        self
    }

    /// Request per-page artifacts.
    pub fn with_page_targets(mut self, targets: Vec<PageTarget>) -> Self {
        self.per_page_targets = targets;
        self
    }

    /// Treat source PDFs as malformed, forcing the OCR path.
    pub fn assume_malformed(mut self, on: bool) -> Self {
        self.assume_malformed_pdfs = on;
        self
    }

    /// Enable the OCR fallback (disabled by default).
    pub fn with_ocr(mut self, enabled: bool) -> Self {
        self.avoid_ocr = !enabled;
        self
    }

    /// Set document filters.
    pub fn with_filters(mut self, filters: DocumentFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Validate the configuration before any document is processed.
    ///
    /// Setext headers cannot host the Obsidian template, and a run that
    /// requests no artifact at all has nothing to do.
    pub fn validate(&self) -> Result<()> {
        if self.md_obsidian_format && self.md_header_format == HeaderStyle::Setext {
            return Err(Error::ConfigValidation(
                "the Obsidian template requires ATX headers; \
                 disable md_obsidian_format or use md_header_format=atx"
                    .into(),
            ));
        }
        if !self.combined_pdf
            && !self.combined_md
            && !self.modified_pdf
            && self.per_page_targets.is_empty()
        {
            return Err(Error::ConfigValidation(
                "no output requested: enable combined_pdf, combined_md, \
                 modified_pdf, or at least one per-page target"
                    .into(),
            ));
        }
        Ok(())
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ann_type: AnnotationKind::Both,
            combined_pdf: true,
            combined_md: true,
            modified_pdf: false,
            md_hl_format: HighlightLayout::WholeBlock,
            md_hl_output_dir: None,
            md_page_offset: 0,
            md_header_format: HeaderStyle::Atx,
            md_obsidian_format: true,
            per_page_targets: Vec::new(),
            assume_malformed_pdfs: false,
            avoid_ocr: true,
            filters: DocumentFilters::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RunOptions::default();
        assert!(options.combined_pdf);
        assert!(options.combined_md);
        assert!(!options.modified_pdf);
        assert!(options.avoid_ocr);
        assert!(options.md_obsidian_format);
        assert!(options.per_page_targets.is_empty());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_setext_obsidian_rejected() {
        let options = RunOptions::new().with_header_format(HeaderStyle::Setext);
        let err = options.validate().unwrap_err();
        assert!(matches!(err, Error::ConfigValidation(_)));

        let options = RunOptions::new()
            .with_header_format(HeaderStyle::Setext)
            .with_obsidian_format(false);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_no_output_rejected() {
        let options = RunOptions::new()
            .with_combined_pdf(false)
            .with_combined_md(false);
        assert!(options.validate().is_err());

        let options = options.with_modified_pdf(true);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_filters_anded() {
        let filters = DocumentFilters {
            name: Some("thesis".into()),
            uuid: None,
            path: Some("research".into()),
        };
        assert!(filters.matches("my thesis notes", "u1", "/research/2024"));
        assert!(!filters.matches("my thesis notes", "u1", "/misc"));
        assert!(!filters.matches("groceries", "u1", "/research/2024"));

        let open = DocumentFilters::default();
        assert!(open.matches("anything", "u2", "/"));
    }

    #[test]
    fn test_page_target_extensions() {
        assert_eq!(PageTarget::from_extension("PNG"), Some(PageTarget::Png));
        assert_eq!(PageTarget::from_extension("md"), Some(PageTarget::Markdown));
        assert_eq!(PageTarget::from_extension("docx"), None);
        assert_eq!(PageTarget::Svg.extension(), "svg");
    }

    #[test]
    fn test_ann_type_selectors() {
        assert!(AnnotationKind::Both.includes_scribbles());
        assert!(AnnotationKind::Both.includes_highlights());
        assert!(!AnnotationKind::Scribbles.includes_highlights());
        assert!(!AnnotationKind::Highlights.includes_scribbles());
    }
}
