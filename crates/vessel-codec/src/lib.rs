//! Value ⇄ bytes codecs for Vessel payloads.
//!
//! A [`Codec`] turns a typed value into the byte payload persisted by the
//! record store and back again. Vessel never interprets payloads itself;
//! the codec fully owns the encoded layout.
//!
//! Two codecs ship with the crate:
//!
//! - [`JsonCodec`] — human-readable JSON, the default
//! - [`BincodeCodec`] — compact binary encoding
//!
//! Codecs are stateless and cheap to construct. Mixing codecs over one
//! store is undefined: payloads written by one codec are, at best, a
//! [`CodecError::Decode`] for the other.

pub mod error;
pub mod traits;

mod bin;
mod json;

pub use bin::BincodeCodec;
pub use error::{CodecError, CodecResult};
pub use json::JsonCodec;
pub use traits::Codec;
