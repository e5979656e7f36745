//! # Hash Primitives (§4.1)
//!
//! Canonical SHA-256 of bytes, pair hashing, and the canonical entry digest.
//! No custom crypto: every digest here is a vetted `sha2::Sha256`.

use sha2::{Digest as Sha2Digest, Sha256};

use ledger_types::{EntryData, Hash};

/// `sha256(bytes)` as a lowercase hex [`Hash`].
pub fn sha256(bytes: &[u8]) -> Hash {
    let digest = Sha256::digest(bytes);
    Hash::from_hex_unchecked(hex::encode(digest))
}

/// `hash_pair(left, right) = sha256(utf8(left) ++ utf8(right))`.
///
/// Order-sensitive: `hash_pair(a, b) != hash_pair(b, a)` in general.
pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut buf = String::with_capacity(128);
    buf.push_str(left.as_str());
    buf.push_str(right.as_str());
    sha256(buf.as_bytes())
}

/// Canonicalize a JSON value to a deterministic string: object keys sorted
/// lexicographically (via `serde_json::Map`'s `BTreeMap` backing — this
/// crate does not enable the `preserve_order` feature), minimal number
/// representation, and `\u`-escaping only where `serde_json` requires it.
pub fn canonical_json(value: &serde_json::Value) -> String {
    serde_json::to_string(value).expect("serde_json::Value always serializes")
}

/// The canonical entry digest (§4.1).
///
/// **Deviation from the reference** (documented in DESIGN.md and SPEC_FULL.md
/// §9): the reference folds `Date.now()` into this hash, which makes
/// `hash_entry` non-deterministic across recomputation from `(position,
/// data)` alone. This implementation omits the timestamp from the hash;
/// `LedgerEntry::created_at` carries it instead. The digest is therefore a
/// pure, reproducible function of `(position, data)`.
pub fn hash_entry(data: &EntryData, position: u64) -> Hash {
    let mut obj = serde_json::Map::new();
    obj.insert("position".to_string(), serde_json::Value::String(position.to_string()));
    obj.insert("data".to_string(), data.clone());
    let canonical = canonical_json(&serde_json::Value::Object(obj));
    sha256(canonical.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_empty_is_genesis_hash() {
        assert_eq!(sha256(b"").as_str(), ledger_types::GENESIS_HASH);
    }

    #[test]
    fn hash_pair_is_order_sensitive() {
        let a = sha256(b"a");
        let b = sha256(b"b");
        assert_ne!(hash_pair(&a, &b), hash_pair(&b, &a));
    }

    #[test]
    fn hash_entry_is_deterministic_for_same_inputs() {
        let data = serde_json::json!({"b": 2, "a": 1});
        let h1 = hash_entry(&data, 7);
        let h2 = hash_entry(&data, 7);
        assert_eq!(h1, h2);
    }

    #[test]
    fn hash_entry_sorts_object_keys() {
        let data_ab = serde_json::json!({"a": 1, "b": 2});
        let data_ba = serde_json::json!({"b": 2, "a": 1});
        assert_eq!(hash_entry(&data_ab, 0), hash_entry(&data_ba, 0));
    }

    #[test]
    fn hash_entry_distinguishes_position() {
        let data = serde_json::json!({"x": 1});
        assert_ne!(hash_entry(&data, 0), hash_entry(&data, 1));
    }
}
