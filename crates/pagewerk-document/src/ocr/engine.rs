// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR engine seams. Recognition and orientation detection are separate traits
// so a recognizer without OSD can be paired with `NoSkewDetection`.

use image::DynamicImage;
use pagewerk_core::error::ConvertError;
use pagewerk_core::types::Language;

/// A text recognition engine.
pub trait TextRecognizer {
    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    /// Check that the engine can run for `language` before any image is
    /// processed. A missing engine is `OcrEngine`; a missing language pack
    /// is `Config`.
    fn ensure_ready(&self, language: Language) -> Result<(), ConvertError>;

    /// Recognize all text in `image`.
    fn recognize(&self, image: &DynamicImage, language: Language) -> Result<String, ConvertError>;
}

/// Detects how far page content is rotated, in degrees counter-clockwise.
pub trait SkewDetector {
    /// `None` when detection is unavailable or inconclusive.
    fn detect_skew_angle(&self, image: &DynamicImage) -> Option<f32>;
}

/// Detector for engines with no orientation support; always reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSkewDetection;

impl SkewDetector for NoSkewDetection {
    fn detect_skew_angle(&self, _image: &DynamicImage) -> Option<f32> {
        None
    }
}
