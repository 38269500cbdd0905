// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artifact delivery. A sink receives the artifact handle explicitly and
// reports success or failure with its own error type, independent of the
// conversion errors.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, instrument};

use crate::artifact::Artifact;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("destination unavailable: {0}")]
    Unavailable(String),

    #[error("delivery rejected: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where and how much was delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Human-readable location (path, URL, remote id).
    pub location: String,
    pub bytes_written: usize,
}

/// A destination for finished artifacts, such as a local folder or a cloud
/// drive.
pub trait ArtifactSink {
    fn name(&self) -> &str;

    fn deliver(&self, artifact: &Artifact) -> Result<Delivery, SinkError>;
}

/// Saves artifacts into a local directory under their file name.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ArtifactSink for DirectorySink {
    fn name(&self) -> &str {
        "directory"
    }

    #[instrument(skip_all, fields(dir = %self.dir.display(), id = %artifact.id))]
    fn deliver(&self, artifact: &Artifact) -> Result<Delivery, SinkError> {
        if self.dir.exists() && !self.dir.is_dir() {
            return Err(SinkError::Unavailable(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        let path = artifact.persist(&self.dir).map_err(|err| match err {
            pagewerk_core::ConvertError::Io(io) => SinkError::Io(io),
            other => SinkError::Rejected(other.to_string()),
        })?;

        info!(path = %path.display(), "Artifact delivered");
        Ok(Delivery {
            location: path.display().to_string(),
            bytes_written: artifact.bytes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/out");
        let artifact = Artifact::new("converted.pdf", b"%PDF-1.5\n".to_vec(), 0, false, vec![]);

        let delivery = DirectorySink::new(&target).deliver(&artifact).unwrap();
        assert_eq!(delivery.bytes_written, 9);
        assert_eq!(std::fs::read(target.join("converted.pdf")).unwrap(), b"%PDF-1.5\n");
    }

    #[test]
    fn file_in_place_of_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let artifact = Artifact::new("converted.pdf", vec![1, 2, 3], 0, false, vec![]);

        let result = DirectorySink::new(&blocker).deliver(&artifact);
        assert!(matches!(result, Err(SinkError::Unavailable(_))));
    }
}
