// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion artifact: the serialized output of one pipeline run, identified
// by a fresh UUID and fingerprinted with SHA-256. Each run owns its artifact;
// nothing is shared between runs.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use pagewerk_core::error::ConvertError;
use pagewerk_core::types::PipelineState;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::pdf::PdfInspector;

/// Unique identifier of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ArtifactId(pub Uuid);

impl ArtifactId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lowercase hex SHA-256 of `data`.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// The finished PDF of one conversion.
#[derive(Clone)]
pub struct Artifact {
    pub id: ArtifactId,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub sha256: String,
    pub page_count: usize,
    pub encrypted: bool,
    pub created_at: DateTime<Utc>,
    /// Every state the run passed through, `Idle` first and `Ready` last.
    /// Empty for artifacts read back from disk.
    pub states: Vec<PipelineState>,
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("id", &self.id)
            .field("file_name", &self.file_name)
            .field("bytes", &self.bytes.len())
            .field("sha256", &self.sha256)
            .field("page_count", &self.page_count)
            .field("encrypted", &self.encrypted)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl Artifact {
    pub(crate) fn new(
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        page_count: usize,
        encrypted: bool,
        states: Vec<PipelineState>,
    ) -> Self {
        let sha256 = hash_bytes(&bytes);
        Self {
            id: ArtifactId::new(),
            file_name: file_name.into(),
            bytes,
            sha256,
            page_count,
            encrypted,
            created_at: Utc::now(),
            states,
        }
    }

    /// Write the artifact to `dir/<file_name>` and return the path.
    ///
    /// The bytes land in a temporary file first and are renamed into place,
    /// so readers never observe a partial file. When two artifacts are
    /// persisted to the same path the last writer wins.
    #[instrument(skip_all, fields(id = %self.id, file_name = %self.file_name))]
    pub fn persist(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ConvertError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);

        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(&self.bytes)?;
        staged.as_file().sync_all()?;
        staged.persist(&path).map_err(|err| err.error)?;

        info!(path = %path.display(), bytes = self.bytes.len(), "Artifact persisted");
        Ok(path)
    }

    /// Read a previously persisted artifact back from disk.
    ///
    /// The id and timestamp are fresh; the state trace is empty.
    #[instrument(fields(path = %path.as_ref().display()), skip(path))]
    pub fn read_by_path(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let inspector = PdfInspector::from_bytes(&bytes)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(
            file_name,
            bytes,
            inspector.page_count(),
            inspector.is_encrypted(),
            Vec::new(),
        ))
    }

    /// Serializable metadata without the document bytes.
    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            id: self.id,
            file_name: self.file_name.clone(),
            byte_len: self.bytes.len(),
            sha256: self.sha256.clone(),
            page_count: self.page_count,
            encrypted: self.encrypted,
            created_at: self.created_at,
            states: self.states.clone(),
        }
    }
}

/// Artifact metadata for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSummary {
    pub id: ArtifactId,
    pub file_name: String,
    pub byte_len: usize,
    pub sha256: String,
    pub page_count: usize,
    pub encrypted: bool,
    pub created_at: DateTime<Utc>,
    pub states: Vec<PipelineState>,
}
