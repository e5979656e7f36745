//! # Batch Inclusion Proofs (§4.4)
//!
//! An inclusion proof for many leaves of the same tree at once, sharing
//! sibling nodes that more than one requested leaf needs instead of
//! repeating them once per leaf (§4.4 "shared sibling pool").

use std::collections::HashMap;

use ledger_types::{BatchProof, Direction, Hash};
use thiserror::Error;

use crate::hashing::hash_pair;
use crate::merkle::{MerkleError, MerkleTree};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BatchError {
    #[error(transparent)]
    Merkle(#[from] MerkleError),

    #[error("duplicate index {0} in batch request")]
    DuplicateIndex(u64),
}

/// Build a [`BatchProof`] for `indices` against `tree`'s current state.
///
/// Sibling hashes are deduplicated into a single pool (`proof`); each leaf's
/// entry in `proof_map` lists indices into that pool instead of repeating
/// hashes that more than one leaf's path shares.
pub fn batch_proof(tree: &MerkleTree, indices: &[u64]) -> Result<BatchProof, BatchError> {
    let mut seen = std::collections::HashSet::with_capacity(indices.len());
    for &idx in indices {
        if !seen.insert(idx) {
            return Err(BatchError::DuplicateIndex(idx));
        }
    }

    let mut pool: Vec<Hash> = Vec::new();
    let mut pool_positions: HashMap<Hash, u32> = HashMap::new();
    let mut proof_map = Vec::with_capacity(indices.len());
    let mut directions = Vec::with_capacity(indices.len());
    let mut leaves = Vec::with_capacity(indices.len());

    for &index in indices {
        let single = tree.proof(index)?;
        let mut positions = Vec::with_capacity(single.proof.len());
        for sibling in &single.proof {
            let position = *pool_positions.entry(sibling.clone()).or_insert_with(|| {
                pool.push(sibling.clone());
                (pool.len() - 1) as u32
            });
            positions.push(position);
        }
        leaves.push(single.leaf);
        proof_map.push(positions);
        directions.push(single.directions);
    }

    Ok(BatchProof {
        leaves,
        indices: indices.to_vec(),
        proof: pool,
        proof_map,
        directions,
        root: tree.root(),
    })
}

/// Verify every leaf in a [`BatchProof`] folds to the same embedded root.
pub fn verify_batch(proof: &BatchProof) -> bool {
    let n = proof.leaves.len();
    if proof.indices.len() != n || proof.proof_map.len() != n || proof.directions.len() != n {
        return false;
    }

    for i in 0..n {
        let positions = &proof.proof_map[i];
        let dirs = &proof.directions[i];
        if positions.len() != dirs.len() {
            return false;
        }

        let mut current = proof.leaves[i].clone();
        for (position, direction) in positions.iter().zip(dirs.iter()) {
            let sibling = match proof.proof.get(*position as usize) {
                Some(h) => h,
                None => return false,
            };
            current = match direction {
                Direction::Left => hash_pair(sibling, &current),
                Direction::Right => hash_pair(&current, sibling),
            };
        }
        if current != proof.root {
            return false;
        }
    }

    true
}
