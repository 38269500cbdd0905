// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory output document passed between the assembler and the
// post-processing stages.

use lopdf::{Object, ObjectId};
use pagewerk_core::error::ConvertError;
use tracing::debug;

use super::reader::load_document;

/// An assembled PDF plus the facts the pipeline tracks about it.
#[derive(Debug, Clone)]
pub struct Document {
    inner: lopdf::Document,
    encrypted: bool,
}

impl Document {
    pub(crate) fn new(inner: lopdf::Document) -> Self {
        let encrypted = inner.is_encrypted();
        Self { inner, encrypted }
    }

    /// Parse serialized PDF bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ConvertError> {
        Ok(Self::new(load_document(data)?))
    }

    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Page object ids in page order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.inner.get_pages().into_values().collect()
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    pub(crate) fn mark_encrypted(&mut self) {
        self.encrypted = true;
    }

    pub fn as_lopdf(&self) -> &lopdf::Document {
        &self.inner
    }

    pub(crate) fn as_lopdf_mut(&mut self) -> &mut lopdf::Document {
        &mut self.inner
    }

    /// Title from the /Info dictionary, if present and readable.
    pub fn title(&self) -> Option<String> {
        let info = match self.inner.trailer.get(b"Info").ok()? {
            Object::Reference(id) => self.inner.get_dictionary(*id).ok()?,
            Object::Dictionary(dict) => dict,
            _ => return None,
        };
        match info.get(b"Title").ok()? {
            Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }

    /// Serialize the document.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, ConvertError> {
        let mut output = Vec::new();
        self.inner
            .save_to(&mut output)
            .map_err(|err| ConvertError::Pdf(format!("failed to serialise PDF: {err}")))?;
        debug!(output_bytes = output.len(), encrypted = self.encrypted, "Document serialised");
        Ok(output)
    }
}
