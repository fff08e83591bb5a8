/// Errors from record store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted record is damaged (bad framing, CRC mismatch, or the
    /// record decodes to a different key than its file claims). `what`
    /// names the record by type name or file stem, whichever is known.
    #[error("corrupt record {what}: {reason}")]
    Corrupt { what: String, reason: String },

    /// Record framing could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
