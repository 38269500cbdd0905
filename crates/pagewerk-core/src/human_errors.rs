// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for people converting their own scans.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The severity drives how front ends present the failure.

use crate::error::ConvertError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Something outside the input went wrong; running again may work.
    Transient,
    /// The user must change something (install a tool, pick other files).
    ActionRequired,
    /// The input itself cannot be converted.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether running the same conversion again could succeed. The pipeline
    /// itself never retries.
    pub retriable: bool,
    /// Severity level.
    pub severity: Severity,
}

/// Convert a `ConvertError` into a `HumanError`.
pub fn humanize_error(err: &ConvertError) -> HumanError {
    match err {
        // -- Input errors --
        ConvertError::UnsupportedFormat { name, .. } => HumanError {
            message: format!("\"{name}\" isn't an image we can read."),
            suggestion: "Use JPG, PNG, BMP, GIF, TIFF or WebP files. Nothing was converted, so fix or remove this file and try again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ConvertError::EmptyInput => HumanError {
            message: "No images were selected.".into(),
            suggestion: "Choose at least one image to convert.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ConvertError::Config(detail) => HumanError {
            message: "One of the conversion settings isn't valid.".into(),
            suggestion: format!("Check the settings and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        // -- Stage errors --
        ConvertError::OcrEngine(detail) => humanize_ocr_error(detail),

        ConvertError::Image(_) => HumanError {
            message: "There's a problem with one of the images.".into(),
            suggestion: "The image may be damaged or unusually large. Try saving it as PNG first.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ConvertError::Pdf(_) => HumanError {
            message: "The PDF couldn't be put together.".into(),
            suggestion: "Try again. If this keeps happening, please report it with the images you used.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ConvertError::Encryption(_) => HumanError {
            message: "The PDF couldn't be password-protected.".into(),
            suggestion: "No unprotected copy was saved. Try a different password, or convert without one.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        // -- Storage --
        ConvertError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "We don't have permission to use that file or folder.".into(),
                    suggestion: "Check the permissions, or pick a different output folder.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your disk may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        ConvertError::Serialization(_) => HumanError {
            message: "The settings file couldn't be read.".into(),
            suggestion: "Check that the settings file is valid JSON.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}

/// Parse OCR engine failure details into human-readable messages.
fn humanize_ocr_error(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("not found") || lower.contains("not installed") {
        HumanError {
            message: "Text recognition isn't installed.".into(),
            suggestion: "Install Tesseract OCR (for example `apt install tesseract-ocr`), or convert without OCR.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("model") {
        HumanError {
            message: "The text recognition models are missing.".into(),
            suggestion: format!("Download the OCR models and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else {
        HumanError {
            message: "Text recognition stopped working.".into(),
            suggestion: format!("Try again, or convert without OCR. (Detail: {detail})"),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}
