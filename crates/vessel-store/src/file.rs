use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use vessel_types::{StoredRecord, TypeKey};

use crate::error::{StoreError, StoreResult};
use crate::traits::RecordStore;

/// Record file framing:
///
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized StoredRecord)]
/// ```
const HEADER_LEN: usize = 8;

const RECORD_EXT: &str = "rec";

/// Durable record store: one CRC-framed file per record.
///
/// Each record lives at `<dir>/<key.storage_id()>.rec`. Writes land in a
/// temporary file in the same directory, are fsynced, and are published by
/// atomic rename, so readers only ever observe a complete record and
/// concurrent writers to one key resolve to last-write-wins. `replace`
/// publishes the new record before removing the old one; a crash in between
/// leaves the old record behind, never a missing new one. If removing the
/// old record fails, the publish is rolled back so a failed replace leaves
/// the store as it was.
pub struct FileRecordStore {
    dir: PathBuf,
    // Renames are already atomic per key; the lock keeps multi-file
    // operations (replace, clear) from interleaving with other writers.
    write_lock: Mutex<()>,
}

impl FileRecordStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory this store persists into.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, key: &TypeKey) -> PathBuf {
        self.dir.join(format!("{}.{RECORD_EXT}", key.storage_id()))
    }

    fn encode_record(record: &StoredRecord) -> StoreResult<Vec<u8>> {
        let payload =
            bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut framed = Vec::with_capacity(HEADER_LEN + payload.len());
        framed.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        framed.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        framed.extend_from_slice(&payload);
        Ok(framed)
    }

    /// Decode a framed record file. `what` names the record in errors.
    fn decode_record(what: &str, framed: &[u8]) -> StoreResult<StoredRecord> {
        let corrupt = |reason: &str| StoreError::Corrupt {
            what: what.to_string(),
            reason: reason.to_string(),
        };

        if framed.len() < HEADER_LEN {
            return Err(corrupt("truncated header"));
        }
        let len = u32::from_le_bytes([framed[0], framed[1], framed[2], framed[3]]) as usize;
        let crc = u32::from_le_bytes([framed[4], framed[5], framed[6], framed[7]]);
        let payload = &framed[HEADER_LEN..];
        if payload.len() != len {
            return Err(corrupt("length mismatch"));
        }
        if crc32fast::hash(payload) != crc {
            return Err(corrupt("CRC mismatch"));
        }
        bincode::deserialize(payload).map_err(|e| corrupt(&e.to_string()))
    }

    /// Publish framed bytes at `path` via tempfile-and-rename.
    fn publish(&self, framed: &[u8], path: &Path) -> StoreResult<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(framed)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    /// Write `record` to its file.
    fn write_record(&self, record: &StoredRecord) -> StoreResult<()> {
        let framed = Self::encode_record(record)?;
        self.publish(&framed, &self.record_path(&record.key))
    }

    fn remove_record(&self, key: &TypeKey) -> StoreResult<bool> {
        match fs::remove_file(self.record_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn record_files(&self) -> StoreResult<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXT) {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn get(&self, key: &TypeKey) -> StoreResult<Option<StoredRecord>> {
        let framed = match tokio::fs::read(self.record_path(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record = Self::decode_record(key.name(), &framed)?;
        if &record.key != key {
            return Err(StoreError::Corrupt {
                what: key.name().to_string(),
                reason: "record key does not match its file".to_string(),
            });
        }
        Ok(Some(record))
    }

    async fn put(&self, record: StoredRecord) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        debug!(key = %record.key, bytes = record.size(), "put record");
        self.write_record(&record)
    }

    async fn delete(&self, key: &TypeKey) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let existed = self.remove_record(key)?;
        debug!(key = %key, existed, "delete record");
        Ok(existed)
    }

    async fn replace(&self, old: &TypeKey, new: StoredRecord) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        debug!(old = %old, new = %new.key, "replace record");
        if old == &new.key {
            return self.write_record(&new);
        }

        // Snapshot whatever the new key currently holds so a failed
        // removal of the old record can be rolled back to the pre-call
        // state.
        let new_path = self.record_path(&new.key);
        let prior = match fs::read(&new_path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        self.write_record(&new)?;
        if let Err(err) = self.remove_record(old) {
            let rolled_back = match &prior {
                Some(bytes) => self.publish(bytes, &new_path).is_ok(),
                None => fs::remove_file(&new_path).is_ok(),
            };
            if !rolled_back {
                warn!(new = %new.key, "replace: rollback of published record failed");
            }
            return Err(err);
        }
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<StoredRecord>> {
        let mut records = Vec::new();
        for path in self.record_files()? {
            // The filename is a hash of the key, so the key is only known
            // after decoding; verify it maps back to this file afterwards.
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let framed = tokio::fs::read(&path).await?;
            let record = Self::decode_record(&stem, &framed)?;
            if record.key.storage_id() != stem {
                return Err(StoreError::Corrupt {
                    what: stem,
                    reason: "record key does not match its file".to_string(),
                });
            }
            records.push(record);
        }
        Ok(records)
    }

    async fn clear(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        for path in self.record_files()? {
            fs::remove_file(path)?;
        }
        debug!("cleared store");
        Ok(())
    }
}

impl std::fmt::Debug for FileRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRecordStore")
            .field("dir", &self.dir)
            .finish()
    }
}
