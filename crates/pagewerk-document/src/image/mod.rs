// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: input decoding and OCR preprocessing.

pub mod decode;
pub mod preprocess;

pub use decode::{decode_batch, decode_input};
pub use preprocess::{ImagePreprocessor, NormalizedImage};
