use async_trait::async_trait;

use vessel_types::{StoredRecord, TypeKey};

use crate::error::StoreResult;

/// Type-keyed record store.
///
/// All implementations must satisfy these invariants:
/// - At most one record exists per key at any time.
/// - `put` overwrites any existing record for the same key.
/// - Each operation takes effect atomically per key; concurrent writers to
///   the same key serialize to last-write-wins with no torn record.
/// - The store never interprets record payloads.
/// - All I/O errors are propagated, never silently ignored.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read the record for `key`.
    ///
    /// Returns `Ok(None)` if no record exists for the key.
    /// Returns `Err` on I/O failure or data corruption.
    async fn get(&self, key: &TypeKey) -> StoreResult<Option<StoredRecord>>;

    /// Write `record`, replacing any existing record for its key.
    async fn put(&self, record: StoredRecord) -> StoreResult<()>;

    /// Delete the record for `key`. Returns `true` if a record existed.
    ///
    /// Deleting an absent key is not an error.
    async fn delete(&self, key: &TypeKey) -> StoreResult<bool>;

    /// Atomically remove the record for `old` and write `new`.
    ///
    /// If `old` equals `new.key` this degenerates to `put`. On failure
    /// neither change is visible.
    async fn replace(&self, old: &TypeKey, new: StoredRecord) -> StoreResult<()>;

    /// Read every record in the store. Used for bulk cache preloading.
    async fn list(&self) -> StoreResult<Vec<StoredRecord>>;

    /// Remove every record.
    async fn clear(&self) -> StoreResult<()>;
}
