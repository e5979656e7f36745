//! # Error Taxonomy
//!
//! One variant per invariant or failure mode named in spec.md §7. Every
//! variant carries the context a caller needs to act on it; nothing here
//! is swallowed on the way out of the engine (§7 propagation policy).

use thiserror::Error;

use crate::entities::{EntryId, LedgerId};
use crate::hash::Hash;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("ledger not found: {ledger_id}")]
    LedgerNotFound { ledger_id: LedgerId },

    #[error("entry not found: ledger={ledger_id} entry={entry_id:?}")]
    EntryNotFound {
        ledger_id: LedgerId,
        entry_id: Option<EntryId>,
    },

    #[error("validation error on field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error(
        "sequence violation on ledger {ledger_id}: expected position {expected}, got {actual}"
    )]
    SequenceViolation {
        ledger_id: LedgerId,
        expected: u64,
        actual: u64,
    },

    #[error(
        "chain integrity violation on ledger {ledger_id} at position {position}: expected parent_hash {expected}, got {actual}"
    )]
    ChainIntegrityViolation {
        ledger_id: LedgerId,
        position: u64,
        expected: Hash,
        actual: Hash,
    },

    #[error("duplicate position {position} on ledger {ledger_id}")]
    DuplicatePosition { ledger_id: LedgerId, position: u64 },

    #[error("idempotency key `{key}` on ledger {ledger_id} was already used with a different payload")]
    IdempotencyConflict { ledger_id: LedgerId, key: String },

    #[error("proof is structurally invalid: {reason}")]
    ProofInvalid { reason: String },

    #[error("ledger {ledger_id} is archived and rejects further appends")]
    Archived { ledger_id: LedgerId },

    #[error("tree state corrupt for ledger {ledger_id}: {detail}")]
    TreeStateCorrupt { ledger_id: LedgerId, detail: String },

    #[error("internal error: {detail}")]
    Internal { detail: String },
}

impl LedgerError {
    pub fn internal(detail: impl Into<String>) -> Self {
        LedgerError::Internal {
            detail: detail.into(),
        }
    }

    /// The taxonomy code as named in spec.md §7, for callers that want a
    /// stable machine-readable tag independent of the `Display` message.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::LedgerNotFound { .. } => "LEDGER_NOT_FOUND",
            LedgerError::EntryNotFound { .. } => "ENTRY_NOT_FOUND",
            LedgerError::ValidationError { .. } => "VALIDATION_ERROR",
            LedgerError::SequenceViolation { .. } => "SEQUENCE_VIOLATION",
            LedgerError::ChainIntegrityViolation { .. } => "CHAIN_INTEGRITY_VIOLATION",
            LedgerError::DuplicatePosition { .. } => "DUPLICATE_POSITION",
            LedgerError::IdempotencyConflict { .. } => "IDEMPOTENCY_CONFLICT",
            LedgerError::ProofInvalid { .. } => "PROOF_INVALID",
            LedgerError::Archived { .. } => "ARCHIVED",
            LedgerError::TreeStateCorrupt { .. } => "TREE_STATE_CORRUPT",
            LedgerError::Internal { .. } => "INTERNAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        let err = LedgerError::SequenceViolation {
            ledger_id: "l1".into(),
            expected: 3,
            actual: 5,
        };
        assert_eq!(err.code(), "SEQUENCE_VIOLATION");
        assert!(err.to_string().contains("expected position 3"));
    }
}
