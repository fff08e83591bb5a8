//! Vessel: a type-keyed singleton object store.
//!
//! A [`Vessel`] persists at most one value per Rust type. Values are
//! addressed by their type alone — no string keys to invent or collide on —
//! encoded through a pluggable [`Codec`] and stored through a pluggable
//! [`RecordStore`]. Every operation exists as native `async` and as a
//! `_blocking` wrapper for synchronous call sites.
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use vessel_runtime::Vessel;
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Theme {
//!     dark: bool,
//! }
//!
//! let vessel = Vessel::builder("prefs").build().unwrap();
//! vessel.set_blocking(&Theme { dark: true }).unwrap();
//! assert_eq!(
//!     vessel.get_blocking::<Theme>().unwrap(),
//!     Some(Theme { dark: true })
//! );
//! ```
//!
//! # Building blocks
//!
//! - [`VesselBuilder`] — configure store, codec, cache, callbacks, profiling
//! - [`VesselCache`] — optional in-memory cache over encoded payloads
//! - [`Watch`] — observe one type's value as a distinct-value stream
//! - [`PreloadReport`] — outcome of bulk-loading the store into the cache
//! - [`ProfileData`] — opt-in timing and cache-hit statistics
//! - [`NoOpVessel`] — inert stand-in with the same method surface

mod blocking;
mod vessel;
mod watch;

pub mod cache;
pub mod callback;
pub mod error;
pub mod noop;
pub mod preload;
pub mod profiler;

pub use cache::{CacheSlot, DefaultCache, LruCache, VesselCache};
pub use callback::VesselCallback;
pub use error::{VesselError, VesselResult};
pub use noop::{NoOpVessel, NoOpWatch};
pub use preload::PreloadReport;
pub use profiler::{ProfileData, ProfileEvent, Span, SpanData, Worker, WorkerData, WorkerKind};
pub use vessel::{Vessel, VesselBuilder};
pub use watch::Watch;

// The full surface in one import for embedders.
pub use vessel_codec::{BincodeCodec, Codec, CodecError, JsonCodec};
pub use vessel_store::{
    FileRecordStore, InMemoryRecordStore, RecordStore, StoreError, StoreResult,
};
pub use vessel_types::{StoredRecord, TypeError, TypeKey};
