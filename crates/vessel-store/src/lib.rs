//! Record storage backends for Vessel.
//!
//! A record store persists exactly one [`StoredRecord`] per
//! [`TypeKey`](vessel_types::TypeKey) and never interprets record payloads —
//! it is a pure key-value store over type identity.
//!
//! # Backends
//!
//! All backends implement the [`RecordStore`] trait:
//!
//! - [`InMemoryRecordStore`] — `HashMap`-based store for tests and embedding
//! - [`FileRecordStore`] — durable store, one CRC-framed file per record
//!
//! # Design Rules
//!
//! 1. At most one record per key; `put` replaces, `delete` removes.
//! 2. Each operation takes effect atomically per key.
//! 3. Absence is `Ok(None)` / `Ok(false)`, never an error.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileRecordStore;
pub use memory::InMemoryRecordStore;
pub use traits::RecordStore;
