// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Result};
use crate::{Language, PageSize};

/// Default file name of the produced document.
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "converted.pdf";

/// Settings for one conversion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Replace each image with a text page built from OCR output.
    pub ocr_enabled: bool,
    /// OCR language.
    pub language: Language,
    /// Text stamped on every page. `None` or empty skips the stage.
    pub watermark_text: Option<String>,
    /// Password sealing the final document. `None` or empty skips the stage.
    pub password: Option<String>,
    /// Page size for OCR text pages.
    pub page_size: PageSize,
    /// File name used when the artifact is persisted or delivered.
    pub output_file_name: String,
    /// Title embedded in the PDF /Info dictionary.
    pub title: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            ocr_enabled: false,
            language: Language::Eng,
            watermark_text: None,
            password: None,
            page_size: PageSize::A4,
            output_file_name: DEFAULT_OUTPUT_FILE_NAME.to_string(),
            title: "Pagewerk Document".to_string(),
        }
    }
}

impl ConversionConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    ///
    /// An unknown language code is a `Config` error, the same as on the
    /// command line; other malformed content is a `Serialization` error.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        if let Some(code) = value.get("language").and_then(|lang| lang.as_str()) {
            code.parse::<Language>()?;
        }
        let config: Self = serde_json::from_value(value)?;
        Ok(config)
    }

    /// Watermark text, if the stage should run.
    pub fn watermark(&self) -> Option<&str> {
        self.watermark_text.as_deref().filter(|text| !text.is_empty())
    }

    /// Encryption password, if the stage should run.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|pw| !pw.is_empty())
    }

    /// Reject configurations that cannot produce a valid artifact.
    pub fn validate(&self) -> Result<()> {
        let name = self.output_file_name.trim();
        if name.is_empty() {
            return Err(ConvertError::Config("output file name is empty".into()));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(ConvertError::Config(format!(
                "output file name '{name}' must not contain path separators"
            )));
        }
        Ok(())
    }
}
