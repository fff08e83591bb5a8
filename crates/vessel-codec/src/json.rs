use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CodecError, CodecResult};
use crate::traits::Codec;

/// JSON codec backed by `serde_json`. The default payload format.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> CodecResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode {
            type_name: std::any::type_name::<T>().to_string(),
            reason: e.to_string(),
        })
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<T> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode {
            type_name: std::any::type_name::<T>().to_string(),
            reason: e.to_string(),
        })
    }

    fn probe(&self, bytes: &[u8]) -> CodecResult<()> {
        serde_json::from_slice::<serde_json::Value>(bytes)
            .map(|_| ())
            .map_err(|e| CodecError::Malformed(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct SimpleData {
        name: String,
        number: i32,
    }

    #[test]
    fn round_trip() {
        let codec = JsonCodec::new();
        let value = SimpleData {
            name: "Alice".into(),
            number: 42,
        };
        let bytes = codec.encode(&value).unwrap();
        let back: SimpleData = codec.decode(&bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn decode_error_names_the_target_type() {
        let codec = JsonCodec::new();
        let err = codec.decode::<SimpleData>(b"{\"name\": 7}").unwrap_err();
        match err {
            CodecError::Decode { type_name, .. } => {
                assert!(type_name.contains("SimpleData"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn probe_accepts_valid_json() {
        let codec = JsonCodec::new();
        assert!(codec.probe(b"{\"name\":\"Alice\",\"number\":42}").is_ok());
    }

    #[test]
    fn probe_rejects_garbage() {
        let codec = JsonCodec::new();
        assert!(matches!(
            codec.probe(b"\x00\x01not json"),
            Err(CodecError::Malformed(_))
        ));
    }
}
