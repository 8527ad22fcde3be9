//! BLAKE3 checksums used as content identity for snapshot values

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AssetError;

/// A BLAKE3 content checksum (32 bytes)
///
/// Equal checksums imply equal content. The total order only exists so that
/// set operations and serialized collections are deterministic.
///
/// Human-readable formats (JSON, TOML) carry it as a hex string; binary
/// formats carry the raw 32 bytes.
#[derive(Copy, Clone, Default, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Checksum([u8; 32]);

impl Checksum {
    /// Marker for "no value" (e.g. no frozen document attached)
    pub const NULL: Checksum = Checksum([0; 32]);

    /// Create a new Checksum from bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the checksum as a byte slice
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0; 32]
    }

    /// Convert to lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 12 hex characters, for log lines
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(12);
        hex
    }

    /// Parse from a 64 character hex string
    pub fn from_hex(text: &str) -> Result<Self, AssetError> {
        if text.len() != 64 {
            return Err(AssetError::Decode {
                reason: format!(
                    "invalid checksum length: expected 64 characters, got {}",
                    text.len()
                ),
            });
        }

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(text, &mut bytes).map_err(|e| AssetError::Decode {
            reason: format!("invalid checksum '{}': {}", text, e),
        })?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Debug for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Checksum({})", self.short())
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for Checksum {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Checksum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Checksum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            Checksum::from_hex(&text).map_err(serde::de::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Checksum)
        }
    }
}

/// Hash raw bytes
pub fn hash_bytes(data: &[u8]) -> Checksum {
    Checksum::from_bytes(*blake3::hash(data).as_bytes())
}

/// Incremental hasher for composite checksums
///
/// Every checksum starts with a one-byte domain tag so that two different
/// kinds of value with the same encoding never collide.
pub struct ChecksumHasher {
    inner: blake3::Hasher,
}

impl ChecksumHasher {
    pub fn new(tag: u8) -> Self {
        let mut inner = blake3::Hasher::new();
        inner.update(&[tag]);
        Self { inner }
    }

    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    pub fn update_checksum(&mut self, checksum: &Checksum) -> &mut Self {
        self.inner.update(checksum.as_bytes());
        self
    }

    pub fn update_len(&mut self, len: usize) -> &mut Self {
        self.inner.update(&(len as u64).to_le_bytes());
        self
    }

    /// Feed the bincode encoding of `value`
    pub fn update_value<T: Serialize + ?Sized>(&mut self, value: &T) -> &mut Self {
        // blake3::Hasher is an infallible writer and the value types are plain derives
        bincode::serialize_into(&mut self.inner, value)
            .expect("bincode encoding of a derived value type cannot fail");
        self
    }

    pub fn finalize(&self) -> Checksum {
        Checksum::from_bytes(*self.inner.finalize().as_bytes())
    }
}

/// Checksum of a single serializable value under a domain tag
pub fn checksum_of<T: Serialize + ?Sized>(tag: u8, value: &T) -> Checksum {
    ChecksumHasher::new(tag).update_value(value).finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consistency() {
        let data = b"hello world";
        assert_eq!(hash_bytes(data), hash_bytes(data));
    }

    #[test]
    fn test_hex_encoding_roundtrip() {
        let original = Checksum::from_bytes([42; 32]);
        let decoded = Checksum::from_hex(&original.to_hex()).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_hex_encoding_lowercase() {
        let pattern = [0xde, 0xad, 0xbe, 0xef];
        let mut bytes = [0u8; 32];
        for (i, &byte) in pattern.iter().cycle().take(32).enumerate() {
            bytes[i] = byte;
        }
        let hex = Checksum::from_bytes(bytes).to_hex();
        assert!(hex.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("deadbeef"));
    }

    #[test]
    fn test_hex_decoding_invalid_length() {
        assert!(Checksum::from_hex("abc").is_err());
        assert!(Checksum::from_hex("").is_err());
        assert!(Checksum::from_hex(&"a".repeat(63)).is_err());
    }

    #[test]
    fn test_hex_decoding_invalid_chars() {
        assert!(Checksum::from_hex(&"g".repeat(64)).is_err());
    }

    #[test]
    fn test_null_checksum() {
        assert!(Checksum::NULL.is_null());
        assert!(!hash_bytes(b"").is_null());
    }

    #[test]
    fn test_tag_separates_domains() {
        let value = ("name", 7u32);
        assert_ne!(checksum_of(1, &value), checksum_of(2, &value));
        assert_eq!(checksum_of(1, &value), checksum_of(1, &value));
    }

    #[test]
    fn test_hasher_order_matters() {
        let a = hash_bytes(b"a");
        let b = hash_bytes(b"b");
        let ab = ChecksumHasher::new(0)
            .update_checksum(&a)
            .update_checksum(&b)
            .finalize();
        let ba = ChecksumHasher::new(0)
            .update_checksum(&b)
            .update_checksum(&a)
            .finalize();
        assert_ne!(ab, ba);
    }
}
