//! In-process artifact store.

use super::{ArtifactStore, StoreEntry};
use crate::artifact::ArtifactName;
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Artifacts kept in a map; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<StoreEntry, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned(name: &str) -> StoreError {
    StoreError::Io {
        name: name.to_string(),
        source: std::io::Error::other("memory store lock poisoned"),
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn write(&self, name: &ArtifactName, bytes: &[u8]) -> Result<(), StoreError> {
        self.entries
            .write()
            .map_err(|_| poisoned(name.as_str()))?
            .insert(StoreEntry::from(name), bytes.to_vec());
        Ok(())
    }

    async fn read(&self, name: &ArtifactName) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .entries
            .read()
            .map_err(|_| poisoned(name.as_str()))?
            .get(&StoreEntry::from(name))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<StoreEntry>, StoreError> {
        Ok(self
            .entries
            .read()
            .map_err(|_| poisoned("*"))?
            .keys()
            .cloned()
            .collect())
    }

    async fn delete(&self, entry: &StoreEntry) -> Result<(), StoreError> {
        self.entries
            .write()
            .map_err(|_| poisoned(&entry.to_string()))?
            .remove(entry)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(entry.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_read_delete() {
        let store = MemoryStore::new();
        let name = ArtifactName::generate("converted", "pdf");
        store.write(&name, b"%PDF-1.5").await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.read(&name).await.unwrap().as_deref(), Some(&b"%PDF-1.5"[..]));

        let entry = StoreEntry::from(&name);
        store.delete(&entry).await.unwrap();
        assert!(store.is_empty());
        assert!(store.read(&name).await.unwrap().is_none());
        assert!(matches!(store.delete(&entry).await, Err(StoreError::NotFound(_))));
    }
}
