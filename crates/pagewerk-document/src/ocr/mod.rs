// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR: engine traits, the Tesseract and ocrs backends, and text extraction.

pub mod engine;
pub mod extract;
pub mod tesseract;

#[cfg(feature = "ocrs")]
pub mod ocrs_engine;

pub use engine::{NoSkewDetection, SkewDetector, TextRecognizer};
pub use extract::{ExtractedText, extract};
pub use tesseract::TesseractCli;

#[cfg(feature = "ocrs")]
pub use ocrs_engine::{OcrsEngine, OcrsModels};
