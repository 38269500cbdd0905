// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Pagewerk.

use thiserror::Error;

/// Top-level error type for every stage of an image-to-PDF conversion.
///
/// Any variant aborts the run: the pipeline never hands back a partial
/// document alongside an error.
#[derive(Debug, Error)]
pub enum ConvertError {
    // -- Input errors --
    #[error("input #{index} ({name}) is not a supported image: {reason}")]
    UnsupportedFormat {
        index: usize,
        name: String,
        reason: String,
    },

    #[error("no images were submitted")]
    EmptyInput,

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Stage errors --
    #[error("OCR engine unavailable: {0}")]
    OcrEngine(String),

    #[error("image processing failed: {0}")]
    Image(String),

    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ConvertError>;
