use thiserror::Error;

/// Errors from encoding or decoding a payload.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The value could not be encoded.
    #[error("failed to encode {type_name}: {reason}")]
    Encode { type_name: String, reason: String },

    /// The payload could not be decoded into the requested type.
    #[error("failed to decode {type_name}: {reason}")]
    Decode { type_name: String, reason: String },

    /// The payload is not well-formed for this codec at all.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
