//! Consolidated highlight Markdown.
//!
//! Output is built in memory and only handed back when the document has at
//! least one non-empty highlight text; callers decide where to persist it.
//! Emission is deterministic: no timestamps, page sections in page order.

use std::fmt::Write as FmtWrite;

use crate::config::{HeaderStyle, HighlightLayout, RunOptions};
use crate::model::{Document, Page};

/// Render a whole document's highlights as one Markdown file.
///
/// Returns `None` when no page carries highlight text, in which case no file
/// should be written at all.
pub fn document_markdown(doc: &Document, options: &RunOptions) -> Option<String> {
    if !doc.has_highlight_text() {
        return None;
    }

    let mut out = String::new();

    if options.md_obsidian_format {
        out.push_str("---\n");
        out.push_str("tags:\n  - highlights\n");
        out.push_str("---\n\n");
    }

    push_header(&mut out, 1, &doc.name, options.md_header_format);

    for page in &doc.pages {
        if let Some(section) = page_section(page, options) {
            out.push('\n');
            out.push_str(&section);
        }
    }

    Some(out)
}

/// Render one page's highlights as a standalone Markdown excerpt (the
/// per-page `md` target). `None` when the page has no highlight text.
pub fn page_markdown(doc: &Document, page: &Page, options: &RunOptions) -> Option<String> {
    let section = page_section(page, options)?;
    let mut out = String::new();
    push_header(&mut out, 1, &doc.name, options.md_header_format);
    out.push('\n');
    out.push_str(&section);
    Some(out)
}

/// One `## Page N` section. `None` when the page has no highlight text.
fn page_section(page: &Page, options: &RunOptions) -> Option<String> {
    let texts: Vec<&str> = page.highlight_texts().collect();
    if texts.is_empty() {
        return None;
    }

    let displayed = page.index as i64 + 1 + options.md_page_offset as i64;
    let mut out = String::new();
    push_header(
        &mut out,
        2,
        &format!("Page {displayed}"),
        options.md_header_format,
    );
    out.push('\n');

    match options.md_hl_format {
        HighlightLayout::WholeBlock => {
            out.push_str(&texts.join("\n\n"));
            out.push('\n');
        }
        HighlightLayout::BulletPoints => {
            for text in texts {
                let _ = writeln!(out, "- {text}");
            }
        }
    }
    Some(out)
}

fn push_header(out: &mut String, level: usize, text: &str, style: HeaderStyle) {
    match style {
        HeaderStyle::Atx => {
            let _ = writeln!(out, "{} {}", "#".repeat(level), text);
        }
        HeaderStyle::Setext => {
            let underline = if level == 1 { '=' } else { '-' };
            let _ = writeln!(out, "{}", text);
            let _ = writeln!(out, "{}", underline.to_string().repeat(text.chars().count().max(3)));
        }
    }
}
