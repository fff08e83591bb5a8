use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use vessel_types::{StoredRecord, TypeKey};

use crate::error::StoreResult;
use crate::traits::RecordStore;

/// In-memory, HashMap-based record store.
///
/// Intended for tests and embedding. All records are held behind a `RwLock`
/// for safe concurrent access and cloned on read. Nothing survives the
/// process.
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<TypeKey, StoredRecord>>,
}

impl InMemoryRecordStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().expect("lock poisoned").is_empty()
    }

    /// Total payload bytes across all records.
    pub fn total_bytes(&self) -> usize {
        self.records
            .read()
            .expect("lock poisoned")
            .values()
            .map(|rec| rec.size())
            .sum()
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, key: &TypeKey) -> StoreResult<Option<StoredRecord>> {
        let map = self.records.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    async fn put(&self, record: StoredRecord) -> StoreResult<()> {
        let mut map = self.records.write().expect("lock poisoned");
        map.insert(record.key.clone(), record);
        Ok(())
    }

    async fn delete(&self, key: &TypeKey) -> StoreResult<bool> {
        let mut map = self.records.write().expect("lock poisoned");
        Ok(map.remove(key).is_some())
    }

    async fn replace(&self, old: &TypeKey, new: StoredRecord) -> StoreResult<()> {
        // Both changes happen under one write guard, so no reader observes
        // the intermediate state.
        let mut map = self.records.write().expect("lock poisoned");
        if old != &new.key {
            map.remove(old);
        }
        map.insert(new.key.clone(), new);
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<StoredRecord>> {
        let map = self.records.read().expect("lock poisoned");
        Ok(map.values().cloned().collect())
    }

    async fn clear(&self) -> StoreResult<()> {
        self.records.write().expect("lock poisoned").clear();
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRecordStore")
            .field("record_count", &self.len())
            .finish()
    }
}
