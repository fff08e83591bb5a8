use thiserror::Error;

/// Errors produced by type-key operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("empty type name")]
    EmptyName,

    #[error("unstable type name not allowed as a key: {0}")]
    UnstableName(String),
}
