//! # Hash Type
//!
//! A [`Hash`] is the wire representation used everywhere a digest crosses a
//! crate boundary: a lowercase 64-character hex string over a 32-byte
//! SHA-256 digest. The actual hashing lives in `ledger-core`; this crate
//! only knows the shape.

use std::fmt;

/// A lowercase 64-character hex string representing a 32-byte SHA-256 digest.
///
/// Every hash-typed field in the system uses this type. Construction through
/// [`Hash::from_hex`] enforces the shape; callers that already trust their
/// input (internal recomputation) may use [`Hash::from_hex_unchecked`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Hash(String);

/// `sha256("")`. The distinguished empty-tree / genesis-entry constant.
pub const GENESIS_HASH: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HashShapeError {
    #[error("hash must be exactly 64 hex characters, got {0}")]
    WrongLength(usize),
    #[error("hash contains uppercase characters, which is only accepted internally")]
    Uppercase,
    #[error("hash contains non-hex characters")]
    NotHex,
}

impl Hash {
    /// Parse and validate an external hash string: must be 64 lowercase hex
    /// characters. Uppercase input is rejected per spec (§4.1): "Hash
    /// validation helpers must reject any 64-hex input that contains
    /// uppercase characters from external inputs."
    pub fn from_hex(s: impl Into<String>) -> Result<Self, HashShapeError> {
        let s = s.into();
        if s.len() != 64 {
            return Err(HashShapeError::WrongLength(s.len()));
        }
        if s.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(HashShapeError::Uppercase);
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HashShapeError::NotHex);
        }
        Ok(Hash(s))
    }

    /// Wrap an already-canonical hex string produced internally (e.g. the
    /// output of our own `sha256`) without re-validating. Never use this on
    /// data that originated outside the process.
    pub fn from_hex_unchecked(s: impl Into<String>) -> Self {
        Hash(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn genesis() -> Self {
        Hash(GENESIS_HASH.to_string())
    }

    pub fn is_genesis(&self) -> bool {
        self.0 == GENESIS_HASH
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Hash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Hash> for String {
    fn from(h: Hash) -> Self {
        h.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_hash_is_well_formed() {
        assert!(Hash::from_hex(GENESIS_HASH).is_ok());
        assert_eq!(GENESIS_HASH.len(), 64);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            Hash::from_hex("aa"),
            Err(HashShapeError::WrongLength(2))
        ));
    }

    #[test]
    fn rejects_uppercase() {
        let upper = "A".repeat(64);
        assert!(matches!(Hash::from_hex(upper), Err(HashShapeError::Uppercase)));
    }

    #[test]
    fn rejects_non_hex() {
        let bad = "z".repeat(64);
        assert!(matches!(Hash::from_hex(bad), Err(HashShapeError::NotHex)));
    }

    #[test]
    fn accepts_lowercase_hex() {
        let good = "a".repeat(64);
        assert!(Hash::from_hex(good).is_ok());
    }
}
