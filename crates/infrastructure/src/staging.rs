//! Upload staging
//!
//! Every request writes its inputs and output into one process-wide upload
//! directory under random names. Nothing here deletes files.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Errors raised while staging request files
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Failed to prepare directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Kind of staged file, which determines its name prefix and extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagedKind {
    InputAudio,
    Model,
    OutputAudio,
}

impl StagedKind {
    const fn prefix(self) -> &'static str {
        match self {
            Self::InputAudio => "input",
            Self::Model => "model",
            Self::OutputAudio => "output",
        }
    }

    const fn extension(self) -> &'static str {
        match self {
            Self::InputAudio | Self::OutputAudio => "wav",
            Self::Model => "pth",
        }
    }
}

/// Process-wide upload directory
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the upload directory if it does not exist
    pub async fn ensure(&self) -> Result<(), StagingError> {
        ensure_dir(&self.root).await
    }

    /// Fresh, unused path for a file of `kind`
    pub fn unique_path(&self, kind: StagedKind) -> PathBuf {
        self.root.join(format!(
            "{}_{}.{}",
            kind.prefix(),
            Uuid::new_v4().simple(),
            kind.extension()
        ))
    }

    /// Persist an uploaded payload under a unique name
    pub async fn stage(&self, kind: StagedKind, data: &Bytes) -> Result<PathBuf, StagingError> {
        let path = self.unique_path(kind);
        tokio::fs::write(&path, data)
            .await
            .map_err(|source| StagingError::Write {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), bytes = data.len(), "Staged upload");
        Ok(path)
    }
}

/// Create `path` and its parents
pub async fn ensure_dir(path: &Path) -> Result<(), StagingError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| StagingError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
}
