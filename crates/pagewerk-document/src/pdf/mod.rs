// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: page synthesis, assembly, the in-memory document and inspection.

pub mod assemble;
pub mod document;
pub mod reader;
pub mod synth;

pub use assemble::assemble;
pub use document::Document;
pub use reader::PdfInspector;
pub use synth::{PageKind, PageSynthesizer, SynthesizedPage};
