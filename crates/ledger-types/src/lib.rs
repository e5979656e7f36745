//! # ledger-types
//!
//! Domain entities, proof wire-shapes, and the error taxonomy shared across
//! every other crate in the workspace. This crate is data only — no
//! algorithms, no I/O. See `ledger-core` for the Merkle engine and codecs
//! that operate on these shapes, and `ledger-storage`/`ledger-service` for
//! the ports that move them around.

pub mod auth;
pub mod entities;
pub mod errors;
pub mod hash;
pub mod proof;

pub use auth::AuthContext;
pub use entities::{EntryData, EntryId, IdempotencyRecord, LedgerEntry, LedgerId, LedgerMetadata};
pub use errors::LedgerError;
pub use hash::{Hash, HashShapeError, GENESIS_HASH};
pub use proof::{
    BatchProof, CompactProof, ConsistencyProof, Direction, MerkleProof, QrPayload,
    SerializedProofV1, SparseMerkleProof,
};
