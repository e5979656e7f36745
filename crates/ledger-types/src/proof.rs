//! # Proof Shapes
//!
//! Wire-level shapes for inclusion, batch, consistency, and sparse-tree
//! proofs (§3). The algorithms that produce and verify these live in
//! `ledger-core`; this crate only defines what they look like on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::hash::Hash;

/// Which side of the concatenation a sibling hash occupies during folding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn as_bit(self) -> char {
        match self {
            Direction::Left => '0',
            Direction::Right => '1',
        }
    }

    pub fn from_bit(c: char) -> Option<Self> {
        match c {
            '0' => Some(Direction::Left),
            '1' => Some(Direction::Right),
            _ => None,
        }
    }
}

/// An inclusion proof: a sibling path letting a verifier derive the root
/// from a leaf (full form, §4.3).
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf: Hash,
    #[serde_as(as = "DisplayFromStr")]
    pub index: u64,
    pub proof: Vec<Hash>,
    pub directions: Vec<Direction>,
    pub root: Hash,
}

/// A shared-sibling proof over several leaves of the same tree (§3, §4.4).
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchProof {
    pub leaves: Vec<Hash>,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub indices: Vec<u64>,
    /// Deduplicated sibling pool, in first-occurrence (insertion) order.
    pub proof: Vec<Hash>,
    /// Per-leaf list of indices into `proof`.
    pub proof_map: Vec<Vec<u32>>,
    /// Per-leaf list of directions, parallel to `proof_map`.
    pub directions: Vec<Vec<Direction>>,
    pub root: Hash,
}

/// Evidence that `new_root` is the result of appending to `old_root` (§4.4).
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyProof {
    pub old_root: Hash,
    #[serde_as(as = "DisplayFromStr")]
    pub old_size: u64,
    pub new_root: Hash,
    #[serde_as(as = "DisplayFromStr")]
    pub new_size: u64,
    /// RFC-6962-style sibling list proving the old leaf prefix is unchanged
    /// (see DESIGN.md for why this differs from the reference's bare
    /// `[old_root, new_root]` representation — spec.md §9 explicitly
    /// permits the substitution).
    pub proof: Vec<Hash>,
    pub timestamp: DateTime<Utc>,
}

/// An inclusion or non-inclusion proof against a sparse Merkle tree (§4.8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseMerkleProof {
    pub key: Hash,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Hash>,
    /// One sibling hash per layer, leaf to root.
    pub siblings: Vec<Hash>,
    pub root: Hash,
    pub included: bool,
}

/// Compact wire form of a [`MerkleProof`] (§4.3): `p` concatenates sibling
/// hashes (64 hex chars each); `d` is a string of `'0'`/`'1'` bits.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactProof {
    pub v: u8,
    pub l: Hash,
    pub r: Hash,
    #[serde_as(as = "DisplayFromStr")]
    pub i: u64,
    pub p: String,
    pub d: String,
}

/// Serialized v1 wire form of a [`MerkleProof`] (§4.3): directions carried
/// as an array of `0`/`1` integers instead of a packed bit string.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedProofV1 {
    pub v: u8,
    pub l: Hash,
    #[serde_as(as = "DisplayFromStr")]
    pub i: u64,
    pub p: Vec<Hash>,
    pub d: Vec<u8>,
    pub r: Hash,
}

/// A pointer-only QR payload (§4.3): not the proof itself, a pointer to
/// verify it remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: u8,
    pub ledger_id: String,
    pub entry_id: String,
    pub root_hash: Hash,
    pub verify_url: String,
}
