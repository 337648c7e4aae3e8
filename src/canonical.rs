//! Canonical serialization for stable fingerprints.
//!
//! - Struct fields serialize in declaration order
//! - Vectors serialize in index order
//! - Maps in hashed data must be `BTreeMap`

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes for hashing.
///
/// Values that cannot be represented as JSON (maps with non-string keys)
/// hash as an empty byte string.
pub fn to_canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize + ?Sized>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize + ?Sized>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Sample {
        name: String,
        value: i32,
    }

    #[test]
    fn test_determinism() {
        let s = Sample {
            name: "test".to_string(),
            value: 42,
        };
        assert_eq!(canonical_hash(&s), canonical_hash(&s));
        assert_eq!(canonical_hash_hex(&s).len(), 16);
    }

    #[test]
    fn test_btreemap_insertion_order_irrelevant() {
        let mut a = BTreeMap::new();
        a.insert("x", 1);
        a.insert("y", 2);
        let mut b = BTreeMap::new();
        b.insert("y", 2);
        b.insert("x", 1);
        assert_eq!(canonical_hash(&a), canonical_hash(&b));
    }
}
