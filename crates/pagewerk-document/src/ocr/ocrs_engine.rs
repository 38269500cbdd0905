// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pure-Rust OCR backend built on the `ocrs` crate, with neural network models
// executed via `rten`.
//
// # Feature Gate
//
// Only compiled with the `ocrs` feature:
//
// ```toml
// pagewerk-document = { path = "crates/pagewerk-document", features = ["ocrs"] }
// ```
//
// # Model Setup
//
// The engine needs two model files, `text-detection.rten` and
// `text-recognition.rten`. Running `ocrs-cli` once downloads them to
// `$XDG_CACHE_HOME/ocrs` (typically `~/.cache/ocrs`), which is where
// `OcrsModels::default()` looks.
//
// The bundled models read Latin script only, so this engine accepts eng, spa,
// fra and deu. It has no orientation detection; pair it with
// `NoSkewDetection`.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine as OcrsRuntime, OcrEngineParams};
use pagewerk_core::error::ConvertError;
use pagewerk_core::types::Language;
use rten::Model;
use tracing::{debug, info, instrument};

use super::engine::TextRecognizer;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, falling back to `~/.cache/ocrs`.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Locations of the two model files.
#[derive(Debug, Clone)]
pub struct OcrsModels {
    pub detection: PathBuf,
    pub recognition: PathBuf,
}

impl Default for OcrsModels {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrsModels {
    /// Expect both well-known file names inside `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection: dir.join(DETECTION_MODEL_FILENAME),
            recognition: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    fn validate(&self) -> Result<(), ConvertError> {
        for (kind, path) in [("detection", &self.detection), ("recognition", &self.recognition)] {
            if !path.exists() {
                return Err(ConvertError::OcrEngine(format!(
                    "{kind} model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Text recognizer backed by `ocrs`. Model loading is the expensive step, so
/// build one engine per process and reuse it.
pub struct OcrsEngine {
    runtime: OcrsRuntime,
}

impl OcrsEngine {
    #[instrument(skip_all, fields(
        detection = %models.detection.display(),
        recognition = %models.recognition.display(),
    ))]
    pub fn new(models: OcrsModels) -> Result<Self, ConvertError> {
        models.validate()?;

        let load = |path: &Path| {
            Model::load_file(path).map_err(|err| {
                ConvertError::OcrEngine(format!("failed to load model from {}: {err}", path.display()))
            })
        };

        info!("Loading OCR models");
        let detection_model = load(&models.detection)?;
        let recognition_model = load(&models.recognition)?;

        let runtime = OcrsRuntime::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| ConvertError::OcrEngine(format!("failed to initialise OCR engine: {err}")))?;

        info!("OCR engine initialised");
        Ok(Self { runtime })
    }

    /// Load models from the default cache directory.
    pub fn with_defaults() -> Result<Self, ConvertError> {
        Self::new(OcrsModels::default())
    }
}

impl TextRecognizer for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn ensure_ready(&self, language: Language) -> Result<(), ConvertError> {
        ensure_latin(language)
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn recognize(&self, image: &DynamicImage, language: Language) -> Result<String, ConvertError> {
        ensure_latin(language)?;

        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            ConvertError::OcrEngine(format!(
                "failed to create image source ({width}x{height}): {err}"
            ))
        })?;

        let input = self
            .runtime
            .prepare_input(source)
            .map_err(|err| ConvertError::OcrEngine(format!("OCR preprocessing failed: {err}")))?;

        let text = self
            .runtime
            .get_text(&input)
            .map_err(|err| ConvertError::OcrEngine(format!("OCR text recognition failed: {err}")))?;

        debug!(line_count = text.lines().count(), "ocrs recognition complete");
        Ok(text)
    }
}

fn ensure_latin(language: Language) -> Result<(), ConvertError> {
    if language.is_latin_script() {
        Ok(())
    } else {
        Err(ConvertError::Config(format!(
            "the ocrs engine cannot read '{}'; use the tesseract engine for non-Latin scripts",
            language.code()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn models_from_dir() {
        let models = OcrsModels::from_dir("/tmp/my-models");
        assert_eq!(models.detection, PathBuf::from("/tmp/my-models/text-detection.rten"));
        assert_eq!(models.recognition, PathBuf::from("/tmp/my-models/text-recognition.rten"));
    }

    #[test]
    fn missing_models_are_ocr_engine_errors() {
        let result = OcrsEngine::new(OcrsModels::from_dir("/nonexistent/path/ocr-models"));
        assert!(matches!(result, Err(ConvertError::OcrEngine(_))));
    }

    #[test]
    fn non_latin_languages_are_rejected() {
        assert!(ensure_latin(Language::Deu).is_ok());
        assert!(matches!(ensure_latin(Language::Ara), Err(ConvertError::Config(_))));
        assert!(matches!(ensure_latin(Language::ChiSim), Err(ConvertError::Config(_))));
    }
}
