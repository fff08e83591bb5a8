use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CodecError, CodecResult};
use crate::traits::Codec;

/// Compact binary codec backed by `bincode`.
///
/// Payloads are smaller and faster to decode than JSON, but carry no
/// self-describing structure: [`Codec::probe`] cannot distinguish a stale
/// record from a valid one and accepts any payload.
#[derive(Clone, Copy, Debug, Default)]
pub struct BincodeCodec;

impl BincodeCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for BincodeCodec {
    fn encode<T: Serialize>(&self, value: &T) -> CodecResult<Vec<u8>> {
        bincode::serialize(value).map_err(|e| CodecError::Encode {
            type_name: std::any::type_name::<T>().to_string(),
            reason: e.to_string(),
        })
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<T> {
        bincode::deserialize(bytes).map_err(|e| CodecError::Decode {
            type_name: std::any::type_name::<T>().to_string(),
            reason: e.to_string(),
        })
    }

    fn probe(&self, _bytes: &[u8]) -> CodecResult<()> {
        // Bincode payloads are not self-describing; validity can only be
        // established against a concrete target type at decode time.
        Ok(())
    }

    fn name(&self) -> &'static str {
        "bincode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: i64,
        y: i64,
    }

    #[test]
    fn round_trip() {
        let codec = BincodeCodec::new();
        let value = Point { x: -3, y: 9 };
        let bytes = codec.encode(&value).unwrap();
        let back: Point = codec.decode(&bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn decode_error_on_truncated_payload() {
        let codec = BincodeCodec::new();
        let bytes = codec.encode(&Point { x: 1, y: 2 }).unwrap();
        assert!(matches!(
            codec.decode::<Point>(&bytes[..3]),
            Err(CodecError::Decode { .. })
        ));
    }
}
