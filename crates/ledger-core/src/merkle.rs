//! # Incremental Merkle Tree (§4.2)
//!
//! A binary Merkle tree over a growing ordered sequence of leaf hashes with
//! O(log n) append and O(log n) proof.
//!
//! ## Arena, not a node graph
//!
//! Nodes are addressed by `(layer, index)` in a flat map, never by parent
//! pointers — see spec.md §9 ("Cyclic tree references"). Layer 0 is the
//! leaves; layer `depth` is the root.
//!
//! ## Zero-hash convention
//!
//! spec.md §4.2 names two possible conventions for the default sibling of a
//! missing node and asks implementations to commit to one. This tree uses
//! the reference's simpler convention: every layer's zero-hash is
//! `GENESIS_HASH` (`sha256("")`), not a recursively-doubled per-layer value.

use std::collections::HashMap;

use ledger_types::{Direction, Hash, MerkleProof, GENESIS_HASH};
use thiserror::Error;

use crate::hashing::hash_pair;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MerkleError {
    #[error("index {index} out of bounds for tree of size {size}")]
    IndexOutOfBounds { index: u64, size: u64 },

    #[error("import failed: rebuilt root {actual} does not match exported root {expected}")]
    ImportRootMismatch { expected: Hash, actual: Hash },
}

/// An incremental, array-indexed Merkle tree.
#[derive(Debug, Clone, Default)]
pub struct MerkleTree {
    leaves: Vec<Hash>,
    nodes: HashMap<(u32, u64), Hash>,
}

/// Smallest integer >= ceil(log2(n)) for n >= 1; 0 for n <= 1.
fn depth_for_size(n: u64) -> u32 {
    if n <= 1 {
        0
    } else {
        n.next_power_of_two().trailing_zeros()
    }
}

impl MerkleTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> u64 {
        self.leaves.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn leaves(&self) -> &[Hash] {
        &self.leaves
    }

    fn zero_hash(_layer: u32) -> Hash {
        Hash::from_hex_unchecked(GENESIS_HASH)
    }

    /// The current Merkle root. `GENESIS_HASH` for an empty tree; the sole
    /// leaf hash for a one-leaf tree.
    pub fn root(&self) -> Hash {
        match self.leaves.len() {
            0 => Hash::from_hex_unchecked(GENESIS_HASH),
            1 => self.leaves[0].clone(),
            n => {
                let depth = depth_for_size(n as u64);
                self.nodes
                    .get(&(depth, 0))
                    .cloned()
                    .expect("root node always populated by append")
            }
        }
    }

    /// Append a single leaf hash, returning its 0-based index.
    pub fn append(&mut self, leaf_hash: Hash) -> u64 {
        let index = self.leaves.len() as u64;
        self.leaves.push(leaf_hash.clone());
        self.nodes.insert((0, index), leaf_hash);

        let new_depth = depth_for_size(self.leaves.len() as u64);
        let mut current = self.leaves[index as usize].clone();
        let mut i = index;

        for layer in 0..new_depth {
            let sibling_index = i ^ 1;
            let sibling = self
                .nodes
                .get(&(layer, sibling_index))
                .cloned()
                .unwrap_or_else(|| Self::zero_hash(layer));

            let parent = if i % 2 == 1 {
                hash_pair(&sibling, &current)
            } else {
                hash_pair(&current, &sibling)
            };

            i /= 2;
            self.nodes.insert((layer + 1, i), parent.clone());
            current = parent;
        }

        index
    }

    /// Append a sequence of leaf hashes, returning their indices in order.
    ///
    /// Semantically equivalent to successive [`MerkleTree::append`] calls
    /// (§4.2 "Append-batch").
    pub fn append_batch(&mut self, hashes: impl IntoIterator<Item = Hash>) -> Vec<u64> {
        hashes.into_iter().map(|h| self.append(h)).collect()
    }

    /// Generate the inclusion proof for `index`.
    pub fn proof(&self, index: u64) -> Result<MerkleProof, MerkleError> {
        let size = self.size();
        if index >= size {
            return Err(MerkleError::IndexOutOfBounds { index, size });
        }

        if size == 1 {
            let leaf = self.leaves[0].clone();
            return Ok(MerkleProof {
                leaf: leaf.clone(),
                index: 0,
                proof: Vec::new(),
                directions: Vec::new(),
                root: leaf,
            });
        }

        let depth = depth_for_size(size);
        let mut siblings = Vec::with_capacity(depth as usize);
        let mut directions = Vec::with_capacity(depth as usize);
        let mut i = index;

        for layer in 0..depth {
            let sibling_index = i ^ 1;
            let sibling = self
                .nodes
                .get(&(layer, sibling_index))
                .cloned()
                .unwrap_or_else(|| Self::zero_hash(layer));
            let direction = if i % 2 == 1 {
                Direction::Left
            } else {
                Direction::Right
            };
            siblings.push(sibling);
            directions.push(direction);
            i /= 2;
        }

        Ok(MerkleProof {
            leaf: self.leaves[index as usize].clone(),
            index,
            proof: siblings,
            directions,
            root: self.root(),
        })
    }

    /// Statically verify a proof: fold from leaf to root and compare. Does
    /// not require a tree instance.
    pub fn verify(proof: &MerkleProof) -> bool {
        if proof.proof.len() != proof.directions.len() {
            return false;
        }

        let mut current = proof.leaf.clone();
        for (sibling, direction) in proof.proof.iter().zip(proof.directions.iter()) {
            current = match direction {
                Direction::Left => hash_pair(sibling, &current),
                Direction::Right => hash_pair(&current, sibling),
            };
        }

        current == proof.root
    }

    /// Export the ordered leaf list and the current root.
    pub fn export(&self) -> (Vec<Hash>, Hash) {
        (self.leaves.clone(), self.root())
    }

    /// Roll back to the state after `new_size` leaves, by rebuilding from
    /// the retained prefix. Used by the write pipeline to undo an in-memory
    /// append when the matching storage write is rejected.
    pub fn truncate(&mut self, new_size: u64) {
        let prefix: Vec<Hash> = self.leaves[..new_size as usize].to_vec();
        *self = Self::new();
        self.append_batch(prefix);
    }

    /// Rebuild a tree via `append_batch` and confirm the root matches
    /// `expected_root`, failing with [`MerkleError::ImportRootMismatch`]
    /// otherwise.
    pub fn import(leaves: Vec<Hash>, expected_root: Hash) -> Result<Self, MerkleError> {
        let mut tree = Self::new();
        tree.append_batch(leaves);
        let actual = tree.root();
        if actual != expected_root {
            return Err(MerkleError::ImportRootMismatch {
                expected: expected_root,
                actual,
            });
        }
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_types::GENESIS_HASH;

    fn leaf(byte: u8) -> Hash {
        Hash::from_hex_unchecked(hex::encode([byte; 32]))
    }

    #[test]
    fn empty_tree_root_is_genesis_hash() {
        let tree = MerkleTree::new();
        assert_eq!(tree.root().as_str(), GENESIS_HASH);
        assert_eq!(tree.size(), 0);
    }

    #[test]
    fn single_leaf_root_equals_leaf() {
        let mut tree = MerkleTree::new();
        let l = leaf(0xaa);
        let idx = tree.append(l.clone());
        assert_eq!(idx, 0);
        assert_eq!(tree.root(), l);

        let proof = tree.proof(0).unwrap();
        assert!(proof.proof.is_empty());
        assert!(proof.directions.is_empty());
        assert_eq!(proof.leaf, l);
        assert_eq!(proof.root, l);
        assert!(MerkleTree::verify(&proof));
    }

    #[test]
    fn two_leaves_matches_scenario_c() {
        let mut tree = MerkleTree::new();
        tree.append(leaf(0xaa));
        tree.append(leaf(0xbb));

        let root = tree.root();
        assert_eq!(
            root.as_str(),
            "cb6007b15af2b31b9a0d88bc4fd38e0447fe4b09c2faf4ae5a63daa9dff20d51"
        );

        let proof = tree.proof(0).unwrap();
        assert_eq!(proof.proof.len(), 1);
        assert_eq!(proof.proof[0].as_str(), &"bb".repeat(32));
        assert!(matches!(proof.directions[0], Direction::Right));
        assert!(MerkleTree::verify(&proof));
    }

    #[test]
    fn proof_out_of_bounds_errors() {
        let mut tree = MerkleTree::new();
        tree.append(leaf(1));
        assert!(matches!(
            tree.proof(5),
            Err(MerkleError::IndexOutOfBounds { index: 5, size: 1 })
        ));
    }

    #[test]
    fn every_index_verifies_across_growing_sizes() {
        let mut tree = MerkleTree::new();
        for n in 1u8..=20 {
            tree.append(leaf(n));
            for i in 0..tree.size() {
                let proof = tree.proof(i).unwrap();
                assert!(MerkleTree::verify(&proof), "index {i} at size {n}");
            }
        }
    }

    #[test]
    fn flipping_a_hex_char_breaks_verification() {
        let mut tree = MerkleTree::new();
        for n in 1u8..=5 {
            tree.append(leaf(n));
        }
        let mut proof = tree.proof(2).unwrap();
        let mut corrupted = proof.proof[0].as_str().to_string();
        corrupted.replace_range(0..1, if &corrupted[0..1] == "a" { "b" } else { "a" });
        proof.proof[0] = Hash::from_hex_unchecked(corrupted);
        assert!(!MerkleTree::verify(&proof));
    }

    #[test]
    fn export_import_round_trips() {
        let mut tree = MerkleTree::new();
        for n in 1u8..=9 {
            tree.append(leaf(n));
        }
        let (leaves, root) = tree.export();
        let imported = MerkleTree::import(leaves, root.clone()).unwrap();
        assert_eq!(imported.root(), root);
    }

    #[test]
    fn truncate_undoes_a_trailing_append() {
        let mut tree = MerkleTree::new();
        for n in 1u8..=5 {
            tree.append(leaf(n));
        }
        let root_at_4 = {
            let mut reference = MerkleTree::new();
            for n in 1u8..=4 {
                reference.append(leaf(n));
            }
            reference.root()
        };
        tree.truncate(4);
        assert_eq!(tree.size(), 4);
        assert_eq!(tree.root(), root_at_4);
    }

    #[test]
    fn import_rejects_mismatched_root() {
        let mut tree = MerkleTree::new();
        tree.append(leaf(1));
        tree.append(leaf(2));
        let (leaves, _) = tree.export();
        let bogus_root = Hash::from_hex_unchecked("0".repeat(64));
        assert!(matches!(
            MerkleTree::import(leaves, bogus_root),
            Err(MerkleError::ImportRootMismatch { .. })
        ));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn arbitrary_leaf() -> impl Strategy<Value = Hash> {
        any::<[u8; 32]>().prop_map(|bytes| Hash::from_hex_unchecked(hex::encode(bytes)))
    }

    proptest! {
        /// Property 3 (spec.md §8): every proof generated against a tree
        /// verifies against that tree's own root.
        #[test]
        fn every_generated_proof_verifies(leaves in prop::collection::vec(arbitrary_leaf(), 1..40)) {
            let mut tree = MerkleTree::new();
            tree.append_batch(leaves);
            for i in 0..tree.size() {
                let proof = tree.proof(i).unwrap();
                prop_assert!(MerkleTree::verify(&proof));
            }
        }

        /// Property 4 (spec.md §8): flipping one hex character of any
        /// sibling in a non-trivial proof breaks verification.
        #[test]
        fn flipping_any_sibling_hex_char_breaks_verification(
            leaves in prop::collection::vec(arbitrary_leaf(), 2..40),
            flip_char in 0usize..64,
        ) {
            let mut tree = MerkleTree::new();
            tree.append_batch(leaves);
            let mut proof = tree.proof(0).unwrap();
            prop_assume!(!proof.proof.is_empty());

            let mut corrupted = proof.proof[0].as_str().to_string();
            let c = corrupted.as_bytes()[flip_char] as char;
            let replacement = if c == 'a' { 'b' } else { 'a' };
            corrupted.replace_range(flip_char..flip_char + 1, &replacement.to_string());
            proof.proof[0] = Hash::from_hex_unchecked(corrupted);

            prop_assert!(!MerkleTree::verify(&proof));
        }
    }
}
