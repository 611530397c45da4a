//! Digests for Commitments and Attestation
//!
//! Provides the fixed hashing rules that every implementation must agree on:
//! - Board commitments (SHA-256 over the raw occupancy vector)
//! - Journal digests handed to the attestation backend
//! - Domain-separated hashing for keyed attestation
//!
//! Also carries the hex (de)serializers used by the JSON wire formats.

use sha2::{Digest, Sha256};

/// 256-bit digest (32 bytes).
pub type Hash32 = [u8; 32];

/// Version of the board hashing rule.
///
/// Version 1: `SHA-256(occupancy)`, where `occupancy` is the row-major
/// 0/1 byte vector of the board with no prefix or padding.
pub const BOARD_HASH_VERSION: u8 = 1;

/// Incremental SHA-256 writer with a domain separator.
///
/// Order of updates is part of the digest definition.
pub struct DomainHasher {
    hasher: Sha256,
}

impl DomainHasher {
    /// Create a new hasher seeded with a domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Update with a 32-byte digest.
    #[inline]
    pub fn update_hash(&mut self, hash: &Hash32) {
        self.hasher.update(hash);
    }

    /// Finalize and return the digest.
    pub fn finalize(self) -> Hash32 {
        self.hasher.finalize().into()
    }
}

/// Compute a plain SHA-256 of arbitrary data.
pub fn hash_bytes(data: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Digest of a public output journal, as passed to `AttestationBackend::verify`.
pub fn journal_digest(journal: &[u8]) -> Hash32 {
    hash_bytes(journal)
}

/// Parse a 32-byte digest from hex (with or without `0x` prefix).
pub fn hash_from_hex(s: &str) -> Result<Hash32, hex::FromHexError> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    let mut out = [0u8; 32];
    hex::decode_to_slice(trimmed, &mut out)?;
    Ok(out)
}

/// Short hex prefix of a digest for log lines.
pub fn short_hex(hash: &Hash32) -> String {
    hex::encode(&hash[..4])
}

// =============================================================================
// SERDE HELPERS
// =============================================================================

/// Serialize a `Hash32` as a lowercase hex string.
///
/// Binary formats (bincode) get the raw 32 bytes, so a struct using this
/// helper has the same fixed layout on disk as without it.
pub mod hex32 {
    use super::{hash_from_hex, Hash32};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize as hex (or raw bytes for binary formats).
    pub fn serialize<S: Serializer>(hash: &Hash32, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(hash))
        } else {
            hash.serialize(serializer)
        }
    }

    /// Deserialize from hex, rejecting anything that is not exactly 32 bytes.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash32, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            hash_from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            Hash32::deserialize(deserializer)
        }
    }
}

/// Serialize an `Option<Hash32>` as a hex string or `null`.
pub mod hex32_opt {
    use super::{hash_from_hex, Hash32};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize as hex or null.
    pub fn serialize<S: Serializer>(hash: &Option<Hash32>, serializer: S) -> Result<S::Ok, S::Error> {
        if !serializer.is_human_readable() {
            return hash.serialize(serializer);
        }
        match hash {
            Some(h) => serializer.serialize_str(&hex::encode(h)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize from hex or null.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Hash32>, D::Error> {
        if !deserializer.is_human_readable() {
            return Option::<Hash32>::deserialize(deserializer);
        }
        let s: Option<String> = Option::deserialize(deserializer)?;
        s.map(|s| hash_from_hex(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_bytes_matches_known_vector() {
        // SHA-256("abc")
        let expected = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        assert_eq!(hex::encode(hash_bytes(b"abc")), expected);
    }

    #[test]
    fn test_domain_separation_and_order() {
        let (a, b) = ([1u8; 32], [2u8; 32]);

        let digest = |domain: &[u8], first: &Hash32, second: &Hash32| {
            let mut h = DomainHasher::new(domain);
            h.update_hash(first);
            h.update_hash(second);
            h.finalize()
        };

        assert_ne!(digest(b"DOMAIN_A", &a, &b), digest(b"DOMAIN_B", &a, &b));
        assert_ne!(digest(b"DOMAIN_A", &a, &b), digest(b"DOMAIN_A", &b, &a));
    }

    #[test]
    fn test_hash_from_hex() {
        let hash = [0xabu8; 32];
        let encoded = hex::encode(hash);

        assert_eq!(hash_from_hex(&encoded).unwrap(), hash);
        assert_eq!(hash_from_hex(&format!("0x{}", encoded)).unwrap(), hash);

        // Wrong length
        assert!(hash_from_hex("abcd").is_err());
        // Not hex
        assert!(hash_from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_hex32_serde() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Wrapper {
            #[serde(with = "hex32")]
            digest: Hash32,
            #[serde(with = "hex32_opt")]
            maybe: Option<Hash32>,
        }

        let w = Wrapper { digest: [1; 32], maybe: None };
        let json = serde_json::to_string(&w).unwrap();
        assert!(json.contains(&"01".repeat(32)));
        assert!(json.contains("null"));

        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back, w);
    }

    #[test]
    fn test_hex32_binary_is_raw_bytes() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Wrapper {
            #[serde(with = "hex32")]
            digest: Hash32,
        }

        let w = Wrapper { digest: [7; 32] };
        let bytes = bincode::serialize(&w).unwrap();
        assert_eq!(bytes, vec![7u8; 32]);

        let back: Wrapper = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, w);
    }
}
