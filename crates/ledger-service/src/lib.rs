//! The write pipeline: idempotency, per-ledger locking, schema validation,
//! and the Merkle tree cache that sits in front of a [`ledger_storage::LedgerStore`].

pub mod schema;
pub mod service;

pub use service::{
    AppendOptions, AppendResult, BatchAppendItem, BatchAppendOutcome, LedgerService,
    DEFAULT_BATCH_MAX_ENTRIES, DEFAULT_IDEMPOTENCY_TTL_SECS,
};
