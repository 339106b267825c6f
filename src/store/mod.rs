//! Artifact storage port.
//!
//! The gateway never touches the filesystem directly; it writes through an
//! [`ArtifactStore`]. Production uses [`LocalDirStore`], a flat directory on
//! disk. Tests and embedders can swap in [`MemoryStore`].
//!
//! Names handed to a store for writing are always [`ArtifactName`]s, so
//! implementations can treat them as plain file names. Listing returns raw
//! [`StoreEntry`]s instead: a sweep must also reach leftovers the gateway did
//! not name itself.

pub mod fs;
pub mod memory;

pub use fs::LocalDirStore;
pub use memory::MemoryStore;

use crate::artifact::{Artifact, ArtifactName};
use crate::error::{GatewayError, StoreError};
use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::fmt;
use tracing::{debug, info, warn};

/// One raw entry in a store, whatever its name looks like.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreEntry(OsString);

impl StoreEntry {
    pub fn new(name: impl Into<OsString>) -> Self {
        Self(name.into())
    }

    pub fn as_os_str(&self) -> &OsStr {
        &self.0
    }
}

impl From<&ArtifactName> for StoreEntry {
    fn from(name: &ArtifactName) -> Self {
        Self(name.as_str().into())
    }
}

impl fmt::Display for StoreEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

/// Flat, append/delete-only storage for artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist `bytes` under `name`. Names are unique, so this never overwrites.
    async fn write(&self, name: &ArtifactName, bytes: &[u8]) -> Result<(), StoreError>;

    /// Read an artifact back. `Ok(None)` when it does not exist.
    async fn read(&self, name: &ArtifactName) -> Result<Option<Vec<u8>>, StoreError>;

    /// Enumerate every stored entry, including ones not named by the gateway.
    async fn list(&self) -> Result<Vec<StoreEntry>, StoreError>;

    /// Remove one entry.
    async fn delete(&self, entry: &StoreEntry) -> Result<(), StoreError>;
}

/// Write each artifact under a freshly generated name, in order.
///
/// Stops at the first failure. Artifacts written before it stay in the store.
pub async fn persist_all(
    store: &dyn ArtifactStore,
    artifacts: Vec<Artifact>,
) -> Result<Vec<ArtifactName>, GatewayError> {
    let mut names = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let name = ArtifactName::generate(&artifact.prefix, artifact.extension);
        store.write(&name, &artifact.bytes).await?;
        debug!("Wrote artifact {} ({} bytes)", name, artifact.bytes.len());
        names.push(name);
    }
    Ok(names)
}

/// Best-effort sweep of the whole store.
///
/// Per-entry delete failures are logged and skipped. Returns how many
/// entries were actually removed. Files written concurrently after the
/// listing simply survive.
pub async fn sweep(store: &dyn ArtifactStore) -> Result<usize, GatewayError> {
    let entries = store.list().await?;
    let mut removed = 0;
    for entry in &entries {
        match store.delete(entry).await {
            Ok(()) => removed += 1,
            Err(e) => warn!("Cleanup skipped {}: {}", entry, e),
        }
    }
    info!("Cleanup removed {}/{} artifacts", removed, entries.len());
    Ok(removed)
}
