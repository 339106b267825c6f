//! Flat on-disk artifact directory.

use super::{ArtifactStore, StoreEntry};
use crate::artifact::ArtifactName;
use crate::error::StoreError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

/// Artifacts stored as plain files in one directory.
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the directory (and parents) if it does not exist yet.
    pub async fn ensure(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| io_error(&self.root.display().to_string(), e))?;
        info!("Artifact directory ready: {}", self.root.display());
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &ArtifactName) -> PathBuf {
        self.root.join(name.as_str())
    }
}

fn io_error(name: &str, source: std::io::Error) -> StoreError {
    StoreError::Io {
        name: name.to_string(),
        source,
    }
}

#[async_trait]
impl ArtifactStore for LocalDirStore {
    async fn write(&self, name: &ArtifactName, bytes: &[u8]) -> Result<(), StoreError> {
        tokio::fs::write(self.path_of(name), bytes)
            .await
            .map_err(|e| io_error(name.as_str(), e))
    }

    async fn read(&self, name: &ArtifactName) -> Result<Option<Vec<u8>>, StoreError> {
        match tokio::fs::read(self.path_of(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(name.as_str(), e)),
        }
    }

    async fn list(&self) -> Result<Vec<StoreEntry>, StoreError> {
        let mut dir = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| io_error(&self.root.display().to_string(), e))?;

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| io_error(&self.root.display().to_string(), e))?
        {
            entries.push(StoreEntry::new(entry.file_name()));
        }
        entries.sort();
        Ok(entries)
    }

    async fn delete(&self, entry: &StoreEntry) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.root.join(entry.as_os_str())).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(entry.to_string())),
            Err(e) => Err(io_error(&entry.to_string(), e)),
        }
    }
}
