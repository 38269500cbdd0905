// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Pagewerk conversion pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// Physical page sizes used for OCR text pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    Legal,
}

impl PageSize {
    pub const ALL: [PageSize; 3] = [Self::A4, Self::Letter, Self::Legal];

    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (f32, f32) {
        match self {
            Self::A4 => (210.0, 297.0),
            Self::Letter => (215.9, 279.4),
            Self::Legal => (215.9, 355.6),
        }
    }

    /// Dimensions in PDF points (1/72 inch).
    pub fn dimensions_pt(&self) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        (w * 72.0 / 25.4, h * 72.0 / 25.4)
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::A4 => "A4",
            Self::Letter => "Letter",
            Self::Legal => "Legal",
        };
        f.write_str(name)
    }
}

impl FromStr for PageSize {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a4" => Ok(Self::A4),
            "letter" => Ok(Self::Letter),
            "legal" => Ok(Self::Legal),
            other => Err(ConvertError::Config(format!(
                "unknown page size '{other}' (expected A4, Letter or Legal)"
            ))),
        }
    }
}

/// OCR languages, named by their Tesseract traineddata codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Eng,
    Spa,
    Fra,
    Deu,
    ChiSim,
    Ara,
    Hin,
}

impl Language {
    pub const ALL: [Language; 7] = [
        Self::Eng,
        Self::Spa,
        Self::Fra,
        Self::Deu,
        Self::ChiSim,
        Self::Ara,
        Self::Hin,
    ];

    /// Tesseract language code (`-l` argument).
    pub fn code(&self) -> &'static str {
        match self {
            Self::Eng => "eng",
            Self::Spa => "spa",
            Self::Fra => "fra",
            Self::Deu => "deu",
            Self::ChiSim => "chi_sim",
            Self::Ara => "ara",
            Self::Hin => "hin",
        }
    }

    /// Whether the language is written in the Latin alphabet.
    pub fn is_latin_script(&self) -> bool {
        matches!(self, Self::Eng | Self::Spa | Self::Fra | Self::Deu)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == s)
            .ok_or_else(|| {
                ConvertError::Config(format!(
                    "unsupported OCR language '{s}' (expected one of eng, spa, fra, deu, chi_sim, ara, hin)"
                ))
            })
    }
}

/// Raster formats accepted as conversion input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputFormat {
    Jpeg,
    Png,
    Bmp,
    Gif,
    Tiff,
    WebP,
}

impl InputFormat {
    /// Infer the input format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "bmp" => Some(Self::Bmp),
            "gif" => Some(Self::Gif),
            "tif" | "tiff" => Some(Self::Tiff),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Infer the input format from a file name, if it carries an extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Bmp => "image/bmp",
            Self::Gif => "image/gif",
            Self::Tiff => "image/tiff",
            Self::WebP => "image/webp",
        }
    }
}

/// One uploaded image: its display name and undecoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputImage {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputImage {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// States of one conversion run, in the order the pipeline visits them.
///
/// `Preprocessing` and `Synthesizing` repeat per input image; `Watermarked` and
/// `Encrypted` occur at most once each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Idle,
    Preprocessing { index: usize },
    Synthesizing { index: usize },
    Assembled,
    Watermarked,
    Encrypted,
    Ready,
}
