use vessel_codec::CodecError;
use vessel_store::StoreError;

/// Errors surfaced by vessel operations.
///
/// Absence is never an error: `get` on a missing key is `Ok(None)`. The
/// blocking accessors surface the exact same error values as their async
/// counterparts — the bridge never rewraps.
#[derive(Debug, thiserror::Error)]
pub enum VesselError {
    /// A value or payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The underlying record store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The vessel was already closed when the operation was attempted.
    #[error("vessel {name} is closed")]
    Closed { name: String },

    /// The blocking bridge could not run the operation.
    #[error("blocking bridge: {0}")]
    Bridge(String),
}

/// Result alias for vessel operations.
pub type VesselResult<T> = Result<T, VesselError>;
