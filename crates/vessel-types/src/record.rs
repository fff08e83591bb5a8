use serde::{Deserialize, Serialize};

use crate::key::TypeKey;

/// The durable unit of storage: the encoded payload for one [`TypeKey`].
///
/// At most one record exists per key at any time. Writing a record for a
/// key replaces the previous one; deleting removes it entirely. The record
/// never interprets its payload — encoding and decoding belong to the codec.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// The type key this record belongs to.
    pub key: TypeKey,
    /// Encoded payload bytes.
    pub data: Vec<u8>,
}

impl StoredRecord {
    /// Create a record for `key` holding `data`.
    pub fn new(key: TypeKey, data: Vec<u8>) -> Self {
        Self { key, data }
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
