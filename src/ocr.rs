//! OCR boundary for pages without a usable text layer.
//!
//! The engine itself never links an OCR library; recognition goes through the
//! [`OcrEngine`] trait so callers can plug in whatever backend they have. The
//! default production implementation shells out to the `tesseract` binary in
//! TSV mode. OCR failures never abort a run: the caller degrades to an empty
//! text span and keeps rendering the marks.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::geometry::PdfRect;
use crate::textlayer::TextRun;

/// One recognized word in image pixel space (origin top-left, y down).
#[derive(Debug, Clone, PartialEq)]
pub struct OcrWord {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A recognition backend: bitmap in, positioned words out.
pub trait OcrEngine: Send + Sync {
    /// Recognize a rendered page bitmap (PNG on disk).
    fn recognize(&self, image: &Path) -> Result<Vec<OcrWord>>;

    /// Whether this engine performs any recognition at all.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// No-op engine used when OCR is switched off.
#[derive(Debug, Default)]
pub struct OcrDisabled;

impl OcrEngine for OcrDisabled {
    fn recognize(&self, _image: &Path) -> Result<Vec<OcrWord>> {
        Ok(Vec::new())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Shells out to the `tesseract` CLI (`tesseract <png> stdout tsv`).
///
/// A hung process is killed after the timeout and the call is retried once
/// before giving up.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: String,
    timeout: Duration,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl TesseractCli {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    fn run_once(&self, image: &Path) -> Result<Vec<OcrWord>> {
        let mut child = Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .arg("tsv")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::OcrFailure(format!("failed to spawn {}: {e}", self.binary)))?;

        // Drain stdout on its own thread. Output larger than the pipe buffer
        // would otherwise block the child and trip the timeout.
        let stdout = child.stdout.take();
        let reader = std::thread::spawn(move || -> std::io::Result<String> {
            let mut output = String::new();
            if let Some(mut stdout) = stdout {
                stdout.read_to_string(&mut output)?;
            }
            Ok(output)
        });

        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    if !status.success() {
                        let _ = reader.join();
                        return Err(Error::OcrFailure(format!(
                            "{} exited with {status}",
                            self.binary
                        )));
                    }
                    break;
                }
                Ok(None) => {
                    if started.elapsed() > self.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        let _ = reader.join();
                        return Err(Error::OcrFailure(format!(
                            "{} timed out after {:?}",
                            self.binary, self.timeout
                        )));
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    let _ = reader.join();
                    return Err(Error::OcrFailure(format!("wait failed: {e}")));
                }
            }
        }

        let output = reader
            .join()
            .map_err(|_| Error::OcrFailure("stdout reader panicked".to_string()))?
            .map_err(|e| Error::OcrFailure(format!("read failed: {e}")))?;
        Ok(parse_tsv(&output))
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &Path) -> Result<Vec<OcrWord>> {
        match self.run_once(image) {
            Ok(words) => Ok(words),
            Err(first) => {
                log::warn!("ocr attempt failed, retrying once: {first}");
                self.run_once(image)
            }
        }
    }
}

/// Parse tesseract TSV output. Level 5 rows are words; columns are
/// `level page block par line word left top width height conf text`.
fn parse_tsv(output: &str) -> Vec<OcrWord> {
    let mut words = Vec::new();
    for line in output.lines().skip(1) {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let parse = |s: &str| s.parse::<f32>().ok();
        let (Some(x), Some(y), Some(width), Some(height)) =
            (parse(cols[6]), parse(cols[7]), parse(cols[8]), parse(cols[9]))
        else {
            continue;
        };
        let text = cols[11].trim();
        if text.is_empty() {
            continue;
        }
        words.push(OcrWord {
            text: text.to_string(),
            x,
            y,
            width,
            height,
        });
    }
    words
}

/// Convert recognized words from image pixel space into page-space text runs.
///
/// `px_per_pt` is the raster scale the bitmap was rendered at and
/// `image_height_px` flips the y axis back to the PDF's bottom-left origin.
pub fn words_to_runs(words: &[OcrWord], image_height_px: f32, px_per_pt: f32) -> Vec<TextRun> {
    words
        .iter()
        .map(|w| TextRun {
            text: w.text.clone(),
            rect: PdfRect {
                x: w.x / px_per_pt,
                y: (image_height_px - w.y - w.height) / px_per_pt,
                width: w.width / px_per_pt,
                height: w.height / px_per_pt,
            },
        })
        .collect()
}
