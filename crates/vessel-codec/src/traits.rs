use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecResult;

/// Converts typed values to and from persisted byte payloads.
///
/// Implementations must be deterministic for a given value and must round
/// trip: `decode(encode(v)) == v` for every value the codec supports. A
/// value or payload the codec cannot handle is a codec error, never a
/// silent default.
pub trait Codec: Send + Sync + 'static {
    /// Encode a value into its payload bytes.
    fn encode<T: Serialize>(&self, value: &T) -> CodecResult<Vec<u8>>;

    /// Decode payload bytes into a value of type `T`.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<T>;

    /// Check that a payload is well-formed for this codec, without knowing
    /// its target type. Used by preload to flag records that can no longer
    /// be decoded at all.
    fn probe(&self, bytes: &[u8]) -> CodecResult<()>;

    /// Short name for logging ("json", "bincode", ...).
    fn name(&self) -> &'static str;
}
