//! Artifact Storage
//!
//! Rendered documents are written to a local directory under a fresh
//! random name. An [`Artifact`] owns its file and removes it when dropped,
//! unless the store was told to retain artifacts.

use std::path::{Path, PathBuf};

use crate::error::{IssueError, Result};

/// Fixed suffix of every artifact file name
pub const ARTIFACT_SUFFIX: &str = "_Business_Info.pdf";

/// Directory-backed artifact store
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
    retain: bool,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, retain: bool) -> Self {
        Self {
            dir: dir.into(),
            retain,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the artifact directory if it does not exist
    pub async fn prepare(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// A new unique artifact name
    pub fn fresh_name() -> String {
        format!("{}{ARTIFACT_SUFFIX}", uuid::Uuid::new_v4())
    }

    /// Write the bytes, then confirm the file is really there.
    ///
    /// Until that check passes the file is owned by a non-retained
    /// [`Artifact`], so a failed write never leaves a partial file behind.
    pub async fn persist(&self, name: String, bytes: Vec<u8>) -> Result<Artifact> {
        let mut artifact = Artifact {
            path: self.dir.join(&name),
            name,
            bytes: Vec::new(),
            retain: false,
        };

        tokio::fs::write(&artifact.path, &bytes).await.map_err(|e| {
            IssueError::Render(format!("writing {}: {e}", artifact.path.display()))
        })?;

        let exists = tokio::fs::try_exists(&artifact.path)
            .await
            .map_err(|e| IssueError::Unexpected(e.to_string()))?;
        if !exists {
            return Err(IssueError::Render(format!(
                "{} missing after write",
                artifact.path.display()
            )));
        }

        artifact.bytes = bytes;
        artifact.retain = self.retain;
        Ok(artifact)
    }
}

/// A generated document on disk, plus its bytes
#[derive(Debug)]
pub struct Artifact {
    name: String,
    path: PathBuf,
    bytes: Vec<u8>,
    retain: bool,
}

impl Artifact {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Move the bytes out, e.g. into a response body. The file stays until drop.
    pub fn take_bytes(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }
}

impl Drop for Artifact {
    fn drop(&mut self) {
        if self.retain {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(artifact = %self.name, "Removed artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(artifact = %self.name, error = %e, "Failed to remove artifact"),
        }
    }
}
