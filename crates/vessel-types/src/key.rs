use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Stable identifier derived from a type's fully qualified name.
///
/// A `TypeKey` addresses the single stored record for a type. Two values of
/// the same declared type always resolve to the same key; distinct types
/// resolve to distinct keys. Built-in types resolve to their canonical
/// platform name (`TypeKey::of::<String>()` is `alloc::string::String`, not
/// whatever alias the caller used).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeKey {
    name: String,
}

impl TypeKey {
    /// Resolve the key for a type.
    pub fn of<T: ?Sized>() -> Self {
        Self {
            name: std::any::type_name::<T>().to_string(),
        }
    }

    /// Resolve the key from a value. Always agrees with [`TypeKey::of`]
    /// for the value's declared type.
    pub fn of_val<T: ?Sized>(_value: &T) -> Self {
        Self::of::<T>()
    }

    /// Reconstruct a key from a previously resolved name.
    ///
    /// Rejects empty names and closure type names, whose compiler-generated
    /// names change whenever the enclosing code moves.
    pub fn from_name(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TypeError::EmptyName);
        }
        if name.contains("{{closure}}") {
            return Err(TypeError::UnstableName(name));
        }
        Ok(Self { name })
    }

    /// The fully qualified type name this key was derived from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filesystem-safe stable identifier: hex-encoded BLAKE3 of the name.
    pub fn storage_id(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"vessel-type-key-v1:");
        hasher.update(self.name.as_bytes());
        hex::encode(hasher.finalize().as_bytes())
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}
