// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagewerk-document: turns a batch of images into one PDF.
//
// Provides input decoding and OCR preprocessing (binarization, orientation
// correction), text recognition engines, per-image page synthesis, document
// assembly, watermark and encryption stages, and the pipeline that ties them
// together into an `Artifact`.

pub mod artifact;
pub mod image;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod postprocess;
pub mod sink;

// Re-export the primary types so callers can use `pagewerk_document::Pipeline` etc.
pub use crate::artifact::{Artifact, ArtifactId, ArtifactSummary};
pub use crate::image::{ImagePreprocessor, NormalizedImage};
pub use crate::ocr::{ExtractedText, NoSkewDetection, SkewDetector, TesseractCli, TextRecognizer};
pub use crate::pdf::{Document, PageSynthesizer, PdfInspector};
pub use crate::pipeline::{ConversionObserver, Pipeline, convert};
pub use crate::postprocess::{Stage, StagePlan};
pub use crate::sink::{ArtifactSink, Delivery, DirectorySink, SinkError};

#[cfg(feature = "ocrs")]
pub use crate::ocr::{OcrsEngine, OcrsModels};
