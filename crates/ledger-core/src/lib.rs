//! Hash primitives, the incremental Merkle tree, proof codecs, and the
//! batch/consistency/sparse proof algorithms (§4.1-§4.4, §4.8).

pub mod batch;
pub mod codecs;
pub mod consistency;
pub mod hashing;
pub mod merkle;
pub mod sparse;

pub use batch::{batch_proof, verify_batch, BatchError};
pub use codecs::{
    binary_envelope_to_compact, build_qr_payload, compact_to_binary_envelope, compact_to_full,
    from_base64url, full_to_compact, full_to_serialized_v1, serialized_v1_to_full, to_base64url,
    CodecError,
};
pub use consistency::{generate as consistency_proof, mth, verify as verify_consistency, ConsistencyError};
pub use hashing::{canonical_json, hash_entry, hash_pair, sha256};
pub use merkle::{MerkleError, MerkleTree};
pub use sparse::{SparseMerkleTree, DEFAULT_DEPTH};
