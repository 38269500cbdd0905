// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tesseract backend. Drives the `tesseract` command-line tool, staging each
// image as a PNG in a private temporary directory.
//
// Recognition: `tesseract <png> stdout -l <lang>`
// Orientation: `tesseract <png> stdout --psm 0` (OSD), reading `Rotate: N`
// Languages:   `tesseract --list-langs`

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use image::{DynamicImage, ImageFormat};
use pagewerk_core::error::ConvertError;
use pagewerk_core::types::Language;
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

use super::engine::{SkewDetector, TextRecognizer};

const DEFAULT_BINARY: &str = "tesseract";

/// Tesseract OCR via its command-line interface.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new()
    }
}

impl TesseractCli {
    /// Use `tesseract` from `PATH`.
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_BINARY),
        }
    }

    /// Use a specific tesseract executable.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Language packs reported by `tesseract --list-langs`.
    pub fn installed_languages(&self) -> Result<Vec<String>, ConvertError> {
        let output = self.run(["--list-langs"])?;
        // The listing may go to stdout or stderr depending on the version.
        let mut listing = String::from_utf8_lossy(&output.stdout).into_owned();
        listing.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(parse_language_list(&listing))
    }

    fn run<I, S>(&self, args: I) -> Result<Output, ConvertError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = Command::new(&self.binary).args(args).output();
        match output {
            Ok(output) => Ok(output),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(ConvertError::OcrEngine(format!(
                    "{} not found (install tesseract-ocr)",
                    self.binary.display()
                )))
            }
            Err(err) => Err(ConvertError::OcrEngine(format!(
                "failed to launch {}: {err}",
                self.binary.display()
            ))),
        }
    }

    fn run_on_image(&self, image: &DynamicImage, extra: &[&str]) -> Result<String, ConvertError> {
        let staging = TempDir::new()?;
        let path = stage_png(image, staging.path())?;

        let output = self.run(
            std::iter::once(path.as_os_str())
                .chain(std::iter::once(OsStr::new("stdout")))
                .chain(extra.iter().map(OsStr::new)),
        )?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ConvertError::OcrEngine(format!(
                "tesseract failed: {}",
                stderr.trim()
            )))
        }
    }
}

impl TextRecognizer for TesseractCli {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    #[instrument(skip(self), fields(binary = %self.binary.display()))]
    fn ensure_ready(&self, language: Language) -> Result<(), ConvertError> {
        let installed = self.installed_languages()?;
        if !installed.iter().any(|code| code == language.code()) {
            return Err(ConvertError::Config(format!(
                "tesseract language pack '{}' is not installed (have: {})",
                language.code(),
                installed.join(", ")
            )));
        }
        info!(language = language.code(), "Tesseract ready");
        Ok(())
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height(), %language))]
    fn recognize(&self, image: &DynamicImage, language: Language) -> Result<String, ConvertError> {
        let text = self.run_on_image(image, &["-l", language.code()])?;
        debug!(chars = text.len(), "Tesseract recognition complete");
        Ok(text)
    }
}

impl SkewDetector for TesseractCli {
    fn detect_skew_angle(&self, image: &DynamicImage) -> Option<f32> {
        match self.run_on_image(image, &["--psm", "0"]) {
            Ok(report) => {
                let angle = parse_osd_rotation(&report);
                if angle.is_none() {
                    debug!("OSD report carried no rotation");
                }
                angle
            }
            Err(err) => {
                // Too little text on the page is the usual cause.
                warn!(error = %err, "Orientation detection failed; assuming upright");
                None
            }
        }
    }
}

fn stage_png(image: &DynamicImage, dir: &Path) -> Result<PathBuf, ConvertError> {
    let path = dir.join("page.png");
    image
        .save_with_format(&path, ImageFormat::Png)
        .map_err(|err| ConvertError::Image(format!("failed to stage image for OCR: {err}")))?;
    Ok(path)
}

/// Extract the `Rotate: N` value from a Tesseract OSD report.
pub fn parse_osd_rotation(report: &str) -> Option<f32> {
    report.lines().find_map(|line| {
        let value = line.trim().strip_prefix("Rotate:")?;
        value.trim().parse::<f32>().ok()
    })
}

/// Parse `--list-langs` output, skipping the header line.
fn parse_language_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of") && !line.contains(' '))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const OSD_REPORT: &str = "Page number: 0\n\
        Orientation in degrees: 270\n\
        Rotate: 90\n\
        Orientation confidence: 8.06\n\
        Script: Latin\n\
        Script confidence: 2.00\n";

    #[test]
    fn parses_rotate_line() {
        assert_eq!(parse_osd_rotation(OSD_REPORT), Some(90.0));
    }

    #[test]
    fn missing_rotate_line_is_none() {
        assert_eq!(parse_osd_rotation("Too few characters. Skipping this page"), None);
        assert_eq!(parse_osd_rotation("Rotate: sideways"), None);
    }

    #[test]
    fn language_listing_skips_header() {
        let listing = "List of available languages in \"/usr/share/tesseract-ocr/5/tessdata/\" (3):\n\
            eng\nosd\nchi_sim\n";
        assert_eq!(parse_language_list(listing), vec!["eng", "osd", "chi_sim"]);
    }

    #[test]
    fn missing_binary_is_ocr_engine_error() {
        let engine = TesseractCli::with_binary("/nonexistent/pagewerk/tesseract");
        match engine.ensure_ready(Language::Eng) {
            Err(ConvertError::OcrEngine(msg)) => assert!(msg.contains("not found")),
            other => panic!("expected OcrEngine error, got {other:?}"),
        }
    }

    #[test]
    fn missing_binary_means_no_skew() {
        let engine = TesseractCli::with_binary("/nonexistent/pagewerk/tesseract");
        let img = DynamicImage::new_luma8(8, 8);
        assert_eq!(engine.detect_skew_angle(&img), None);
    }
}
