//! inkmerge CLI - merge tablet annotations into PDFs and Markdown

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use colored::Colorize;

use inkmerge::{
    AnnotationKind, DocumentFilters, HeaderStyle, HighlightLayout, PageTarget, RunOptions,
    TesseractCli,
};

#[derive(Parser)]
#[command(name = "inkmerge")]
#[command(version)]
#[command(about = "Merge reMarkable ink and highlights into PDFs and Markdown", long_about = None)]
struct Cli {
    /// Export tree root (the xochitl backup directory)
    #[arg(value_name = "INPUT_DIR", env = "INKMERGE_INPUT_DIR")]
    input: PathBuf,

    /// Output directory
    #[arg(value_name = "OUTPUT_DIR", env = "INKMERGE_OUTPUT_DIR")]
    output: PathBuf,

    /// Annotation kinds to process
    #[arg(long, value_enum, default_value = "both")]
    ann_type: AnnType,

    /// Skip the combined annotated PDF
    #[arg(long)]
    skip_combined_pdf: bool,

    /// Skip the consolidated highlights Markdown
    #[arg(long)]
    skip_combined_md: bool,

    /// Also emit a PDF restricted to annotated pages
    #[arg(long)]
    modified_pdf: bool,

    /// Highlight layout in Markdown output
    #[arg(long, value_enum, default_value = "whole-block")]
    md_hl_format: HlFormat,

    /// Write Markdown files to this directory instead of OUTPUT_DIR
    #[arg(long, value_name = "DIR", env = "INKMERGE_MD_HL_OUTPUT_DIR")]
    md_hl_output_dir: Option<PathBuf>,

    /// Offset added to displayed page numbers in Markdown headers
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    md_page_offset: i32,

    /// Markdown header style
    #[arg(long, value_enum, default_value = "atx")]
    md_header_format: HeaderFormat,

    /// Disable the Obsidian frontmatter template
    #[arg(long)]
    no_obsidian: bool,

    /// Per-page artifacts to emit (comma separated: pdf,png,svg,md)
    #[arg(long, value_enum, value_delimiter = ',')]
    per_page: Vec<Target>,

    /// Treat source PDFs as malformed, forcing the OCR path
    #[arg(long)]
    assume_malformed_pdfs: bool,

    /// Enable OCR for pages without a text layer (requires tesseract)
    #[arg(long)]
    ocr: bool,

    /// Tesseract binary to use with --ocr
    #[arg(long, default_value = "tesseract", value_name = "BIN")]
    tesseract: String,

    /// Only process documents whose name contains this substring
    #[arg(long, value_name = "SUBSTR")]
    name: Option<String>,

    /// Only process the document with this identifier
    #[arg(long, value_name = "UUID")]
    uuid: Option<String>,

    /// Only process documents under this folder path
    #[arg(long, value_name = "SUBSTR", env = "INKMERGE_FILE_PATH")]
    folder: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", value_name = "LEVEL")]
    log_level: String,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum AnnType {
    Both,
    Scribbles,
    Highlights,
}

impl From<AnnType> for AnnotationKind {
    fn from(value: AnnType) -> Self {
        match value {
            AnnType::Both => AnnotationKind::Both,
            AnnType::Scribbles => AnnotationKind::Scribbles,
            AnnType::Highlights => AnnotationKind::Highlights,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum HlFormat {
    WholeBlock,
    BulletPoints,
}

impl From<HlFormat> for HighlightLayout {
    fn from(value: HlFormat) -> Self {
        match value {
            HlFormat::WholeBlock => HighlightLayout::WholeBlock,
            HlFormat::BulletPoints => HighlightLayout::BulletPoints,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum HeaderFormat {
    Atx,
    Setext,
}

impl From<HeaderFormat> for HeaderStyle {
    fn from(value: HeaderFormat) -> Self {
        match value {
            HeaderFormat::Atx => HeaderStyle::Atx,
            HeaderFormat::Setext => HeaderStyle::Setext,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Target {
    Pdf,
    Png,
    Svg,
    Md,
}

impl From<Target> for PageTarget {
    fn from(value: Target) -> Self {
        match value {
            Target::Pdf => PageTarget::Pdf,
            Target::Png => PageTarget::Png,
            Target::Svg => PageTarget::Svg,
            Target::Md => PageTarget::Markdown,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .parse_filters(&cli.log_level)
        .init();

    if !cli.input.is_dir() {
        eprintln!(
            "{}: input directory {} does not exist",
            "Error".red().bold(),
            cli.input.display()
        );
        std::process::exit(1);
    }

    let mut options = RunOptions::new()
        .with_ann_type(cli.ann_type.into())
        .with_combined_pdf(!cli.skip_combined_pdf)
        .with_combined_md(!cli.skip_combined_md)
        .with_modified_pdf(cli.modified_pdf)
        .with_hl_format(cli.md_hl_format.into())
        .with_page_offset(cli.md_page_offset)
        .with_header_format(cli.md_header_format.into())
        .with_obsidian_format(!cli.no_obsidian)
        .with_page_targets(cli.per_page.iter().map(|&t| t.into()).collect())
        .assume_malformed(cli.assume_malformed_pdfs)
        .with_ocr(cli.ocr)
        .with_filters(DocumentFilters {
            name: cli.name,
            uuid: cli.uuid,
            path: cli.folder,
        });
    if let Some(dir) = cli.md_hl_output_dir {
        options = options.with_hl_output_dir(dir);
    }

    log::info!(
        "scanning {} into {}",
        cli.input.display(),
        cli.output.display()
    );

    let result = if cli.ocr {
        let engine = TesseractCli::new(cli.tesseract, Duration::from_secs(30));
        inkmerge::run_with_ocr(&cli.input, &cli.output, &options, &engine)
    } else {
        inkmerge::run(&cli.input, &cli.output, &options)
    };

    match result {
        Ok(summary) => {
            println!(
                "{} {} document(s), {} artifact(s)",
                "Processed".green().bold(),
                summary.documents_processed,
                summary.artifacts.len()
            );
            for doc in &summary.processed {
                match &doc.modified {
                    Some(ts) => println!(
                        "  {} ({}) last modified {}",
                        doc.name,
                        doc.uuid,
                        ts.to_rfc3339()
                    ),
                    None => println!("  {} ({})", doc.name, doc.uuid),
                }
            }
            for issue in &summary.page_issues {
                println!(
                    "  {} {} page {}: {}",
                    "degraded".yellow(),
                    issue.document,
                    issue.page_index + 1,
                    issue.detail
                );
            }
            for skip in &summary.skipped {
                println!(
                    "  {} {} ({}): {}",
                    "skipped".yellow(),
                    skip.name.as_deref().unwrap_or("?"),
                    skip.uuid,
                    skip.reason
                );
            }
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }
}
