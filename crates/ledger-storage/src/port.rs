//! # Outbound Storage Port
//!
//! The append-only persistence contract the write pipeline and the
//! integrity monitor depend on. Production dialects: [`crate::sql::SqlStore`]
//! (sqlx, any of SQLite/Postgres) and [`crate::cached::CachedStore`] wrapping
//! either. [`crate::memory::MemoryStore`] backs unit tests.

use async_trait::async_trait;
use ledger_types::{Hash, IdempotencyRecord, LedgerEntry, LedgerError, LedgerId, LedgerMetadata};

/// The storage contract (§6 "Persisted state layout").
///
/// Implementors own the invariants the service relies on but does not
/// re-check itself: `position` strictly monotonic per ledger starting at 0,
/// no two entries at the same `(ledger_id, position)`, and the metadata
/// root/entry_count update landing atomically with (or strictly after) the
/// entry insert it reflects.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn create_ledger(&self, metadata: &LedgerMetadata) -> Result<(), LedgerError>;

    async fn get_ledger(&self, ledger_id: &LedgerId) -> Result<Option<LedgerMetadata>, LedgerError>;

    async fn list_ledgers(&self) -> Result<Vec<LedgerMetadata>, LedgerError>;

    async fn archive_ledger(&self, ledger_id: &LedgerId) -> Result<(), LedgerError>;

    /// Append `entry` and advance the ledger's root/entry_count/last_entry_at
    /// to `new_root` as a single unit. Rejects a `position` that isn't
    /// exactly the current `entry_count` with
    /// [`LedgerError::SequenceViolation`], and a duplicate `(ledger_id,
    /// position)` with [`LedgerError::DuplicatePosition`].
    async fn commit_append(&self, entry: &LedgerEntry, new_root: Hash) -> Result<(), LedgerError>;

    async fn get_entry(
        &self,
        ledger_id: &LedgerId,
        entry_id: &str,
    ) -> Result<Option<LedgerEntry>, LedgerError>;

    async fn get_entry_by_position(
        &self,
        ledger_id: &LedgerId,
        position: u64,
    ) -> Result<Option<LedgerEntry>, LedgerError>;

    /// Entries in ascending position order, for tree reconstruction and the
    /// integrity monitor's full scan.
    async fn list_entries(
        &self,
        ledger_id: &LedgerId,
        from_position: u64,
        limit: u64,
    ) -> Result<Vec<LedgerEntry>, LedgerError>;

    async fn entry_count(&self, ledger_id: &LedgerId) -> Result<u64, LedgerError>;

    async fn get_idempotency_record(
        &self,
        ledger_id: &LedgerId,
        key: &str,
    ) -> Result<Option<IdempotencyRecord>, LedgerError>;

    async fn put_idempotency_record(&self, record: &IdempotencyRecord) -> Result<(), LedgerError>;
}
