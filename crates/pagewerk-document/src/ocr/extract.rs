// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text extraction over normalized images.

use pagewerk_core::error::ConvertError;
use pagewerk_core::types::Language;
use serde::Serialize;
use tracing::{debug, instrument};

use super::engine::TextRecognizer;
use crate::image::NormalizedImage;

/// Text recognized on one page. Empty text is a valid result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedText {
    pub text: String,
    pub language: Language,
}

impl ExtractedText {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Run `engine` once over `image`. No retry.
#[instrument(skip(engine, image), fields(engine = engine.name(), %language))]
pub fn extract(
    engine: &dyn TextRecognizer,
    image: &NormalizedImage,
    language: Language,
) -> Result<ExtractedText, ConvertError> {
    let raw = engine.recognize(image.as_dynamic(), language)?;
    // Tesseract terminates every page with a form feed.
    let text = raw
        .trim_end_matches(|c: char| c.is_whitespace() || c == '\u{c}')
        .to_string();

    debug!(chars = text.chars().count(), lines = text.lines().count(), "Text extracted");
    Ok(ExtractedText { text, language })
}
