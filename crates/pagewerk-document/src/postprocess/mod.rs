// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Post-processing stages applied to the assembled document.
//
// Stages share one shape, `Document -> Result<Document>`, and run in a fixed
// order: watermark before encryption, so the stamp ends up inside the sealed
// content.

pub mod encrypt;
pub mod watermark;

use std::fmt;

use pagewerk_core::config::ConversionConfig;
use pagewerk_core::error::ConvertError;
use pagewerk_core::types::PipelineState;
use tracing::debug;

use crate::pdf::Document;

pub use encrypt::encrypt;
pub use watermark::apply_watermark;

/// One document transform.
#[derive(Clone, PartialEq, Eq)]
pub enum Stage {
    NoOp,
    Watermark(String),
    Encrypt(String),
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOp => f.write_str("NoOp"),
            Self::Watermark(text) => f.debug_tuple("Watermark").field(text).finish(),
            Self::Encrypt(_) => f.write_str("Encrypt(<redacted>)"),
        }
    }
}

impl Stage {
    pub fn apply(&self, document: Document) -> Result<Document, ConvertError> {
        match self {
            Self::NoOp => Ok(document),
            Self::Watermark(text) => apply_watermark(document, text),
            Self::Encrypt(password) => encrypt(document, password),
        }
    }

    /// State the pipeline enters once this stage has run.
    pub fn completed_state(&self) -> Option<PipelineState> {
        match self {
            Self::NoOp => None,
            Self::Watermark(_) => Some(PipelineState::Watermarked),
            Self::Encrypt(_) => Some(PipelineState::Encrypted),
        }
    }
}

/// Ordered list of stages for one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    stages: Vec<Stage>,
}

impl StagePlan {
    /// Watermark (when text is set) before encryption (when a password is
    /// set); a lone `NoOp` when neither applies.
    pub fn from_config(config: &ConversionConfig) -> Self {
        let mut stages = Vec::with_capacity(2);
        if let Some(text) = config.watermark() {
            stages.push(Stage::Watermark(text.to_string()));
        }
        if let Some(password) = config.password() {
            stages.push(Stage::Encrypt(password.to_string()));
        }
        if stages.is_empty() {
            stages.push(Stage::NoOp);
        }
        debug!(?stages, "Post-processing plan built");
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run every stage in order, reporting each completed state.
    pub fn run(
        &self,
        mut document: Document,
        mut on_state: impl FnMut(PipelineState),
    ) -> Result<Document, ConvertError> {
        for stage in &self.stages {
            document = stage.apply(document)?;
            if let Some(state) = stage.completed_state() {
                on_state(state);
            }
        }
        Ok(document)
    }
}
