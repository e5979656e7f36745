//! Caching [`LedgerStore`] composite (§4.5 "Composite dialects").
//!
//! Wraps any dialect and serves `get_ledger`/`list_ledgers` reads from an
//! in-memory cache, invalidating the affected entry on every write so a
//! cache read can never observe a root/entry_count older than the last
//! committed write this process made.

use std::collections::HashMap;

use async_trait::async_trait;
use ledger_types::{Hash, IdempotencyRecord, LedgerEntry, LedgerError, LedgerId, LedgerMetadata};
use tokio::sync::RwLock;

use crate::port::LedgerStore;

pub struct CachedStore<S: LedgerStore> {
    inner: S,
    cache: RwLock<HashMap<LedgerId, LedgerMetadata>>,
}

impl<S: LedgerStore> CachedStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    async fn invalidate(&self, ledger_id: &LedgerId) {
        self.cache.write().await.remove(ledger_id);
    }
}

#[async_trait]
impl<S: LedgerStore> LedgerStore for CachedStore<S> {
    async fn create_ledger(&self, metadata: &LedgerMetadata) -> Result<(), LedgerError> {
        self.inner.create_ledger(metadata).await?;
        self.invalidate(&metadata.id).await;
        Ok(())
    }

    async fn get_ledger(&self, ledger_id: &LedgerId) -> Result<Option<LedgerMetadata>, LedgerError> {
        if let Some(cached) = self.cache.read().await.get(ledger_id) {
            return Ok(Some(cached.clone()));
        }
        let fetched = self.inner.get_ledger(ledger_id).await?;
        if let Some(metadata) = &fetched {
            self.cache
                .write()
                .await
                .insert(ledger_id.clone(), metadata.clone());
        }
        Ok(fetched)
    }

    async fn list_ledgers(&self) -> Result<Vec<LedgerMetadata>, LedgerError> {
        // Listing always goes to the backing dialect: the cache only ever
        // holds a subset of ledgers and can't answer "all of them."
        self.inner.list_ledgers().await
    }

    async fn archive_ledger(&self, ledger_id: &LedgerId) -> Result<(), LedgerError> {
        self.inner.archive_ledger(ledger_id).await?;
        self.invalidate(ledger_id).await;
        Ok(())
    }

    async fn commit_append(&self, entry: &LedgerEntry, new_root: Hash) -> Result<(), LedgerError> {
        self.inner.commit_append(entry, new_root).await?;
        self.invalidate(&entry.ledger_id).await;
        Ok(())
    }

    async fn get_entry(
        &self,
        ledger_id: &LedgerId,
        entry_id: &str,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        self.inner.get_entry(ledger_id, entry_id).await
    }

    async fn get_entry_by_position(
        &self,
        ledger_id: &LedgerId,
        position: u64,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        self.inner.get_entry_by_position(ledger_id, position).await
    }

    async fn list_entries(
        &self,
        ledger_id: &LedgerId,
        from_position: u64,
        limit: u64,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.inner.list_entries(ledger_id, from_position, limit).await
    }

    async fn entry_count(&self, ledger_id: &LedgerId) -> Result<u64, LedgerError> {
        self.inner.entry_count(ledger_id).await
    }

    async fn get_idempotency_record(
        &self,
        ledger_id: &LedgerId,
        key: &str,
    ) -> Result<Option<IdempotencyRecord>, LedgerError> {
        self.inner.get_idempotency_record(ledger_id, key).await
    }

    async fn put_idempotency_record(&self, record: &IdempotencyRecord) -> Result<(), LedgerError> {
        self.inner.put_idempotency_record(record).await
    }
}
