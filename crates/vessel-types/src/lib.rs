//! Foundation types for Vessel.
//!
//! Vessel is a type-keyed singleton store: for every Rust type there is at
//! most one persisted value, addressed by a [`TypeKey`] derived from the
//! type's fully qualified name. This crate provides the key and the durable
//! unit of storage; every other vessel crate depends on it.
//!
//! # Key Types
//!
//! - [`TypeKey`] — stable identifier derived from a type's qualified name
//! - [`StoredRecord`] — the single persisted payload for one key

pub mod error;
pub mod key;
pub mod record;

pub use error::TypeError;
pub use key::TypeKey;
pub use record::StoredRecord;
