//! Content hashing for scan fingerprints
//!
//! Provides [`ContentHash`], a 32-byte Blake3 hash computed over the
//! canonical JSON of a form, recorded in campaign bookkeeping so that two
//! campaigns generated from the same configuration can be recognized.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::json::canonical_json;

/// A 32-byte content hash (Blake3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    fn from_slice(bytes: &[u8]) -> Result<Self, HashError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| HashError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Compute hash of a serializable value over its canonical JSON
    ///
    /// Key order does not affect the result.
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn compute_canonical<T: Serialize>(value: &T) -> Result<Self, HashError> {
        let json = serde_json::to_value(value)?;
        Ok(Self::compute(canonical_json(&json).as_bytes()))
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Hash computation errors
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Wrong byte count
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Malformed hex text
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Value could not be serialized for hashing
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(ContentHash::compute(b"scan"), ContentHash::compute(b"scan"));
        assert_ne!(ContentHash::compute(b"scan"), ContentHash::compute(b"scans"));
    }

    #[test]
    fn canonical_hash_ignores_key_order() {
        let a = ContentHash::compute_canonical(&json!({"a": 1, "b": [1, 2]})).unwrap();
        let b = ContentHash::compute_canonical(&json!({"b": [1, 2], "a": 1})).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn hex_roundtrip() {
        let hash = ContentHash::compute(b"coordinate");
        let parsed: ContentHash = hash.to_string().parse().unwrap();
        assert_eq!(parsed, hash);
        assert_eq!(hash.to_string().len(), 64);
    }

    #[test]
    fn invalid_length_rejected() {
        let result: Result<ContentHash, _> = "deadbeef".parse();
        assert!(matches!(result, Err(HashError::InvalidLength { actual: 4, .. })));
        let result: Result<ContentHash, _> = "not hex".parse();
        assert!(matches!(result, Err(HashError::InvalidHex(_))));
    }
}
