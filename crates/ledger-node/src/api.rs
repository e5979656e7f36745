//! The language-neutral service surface (§6): a trait a binding would sit
//! behind, with no transport attached. Implemented for every
//! [`LedgerService`] storage dialect so `ledger-node` can hand callers a
//! single `Arc<dyn LedgerServiceApi>` regardless of which dialect booted.

use async_trait::async_trait;
use ledger_service::{AppendOptions, AppendResult, BatchAppendItem, BatchAppendOutcome, LedgerService};
use ledger_storage::LedgerStore;
use ledger_types::{Hash, LedgerEntry, LedgerError, LedgerId, LedgerMetadata, MerkleProof};

#[async_trait]
pub trait LedgerServiceApi: Send + Sync {
    async fn create_ledger(
        &self,
        name: String,
        description: Option<String>,
        schema: Option<serde_json::Value>,
    ) -> Result<LedgerMetadata, LedgerError>;

    async fn get_ledger(&self, ledger_id: &LedgerId) -> Result<LedgerMetadata, LedgerError>;

    async fn list_ledgers(&self) -> Result<Vec<LedgerMetadata>, LedgerError>;

    async fn archive_ledger(&self, ledger_id: &LedgerId) -> Result<(), LedgerError>;

    async fn append(
        &self,
        ledger_id: &LedgerId,
        data: serde_json::Value,
        options: AppendOptions,
    ) -> Result<AppendResult, LedgerError>;

    async fn batch_append(
        &self,
        ledger_id: &LedgerId,
        items: Vec<BatchAppendItem>,
    ) -> Result<BatchAppendOutcome, LedgerError>;

    async fn get_entry(
        &self,
        ledger_id: &LedgerId,
        entry_id: &str,
        include_proof: bool,
    ) -> Result<(LedgerEntry, Option<MerkleProof>), LedgerError>;

    async fn current_root(&self, ledger_id: &LedgerId) -> Result<Hash, LedgerError>;
}

#[async_trait]
impl<S: LedgerStore + 'static> LedgerServiceApi for LedgerService<S> {
    async fn create_ledger(
        &self,
        name: String,
        description: Option<String>,
        schema: Option<serde_json::Value>,
    ) -> Result<LedgerMetadata, LedgerError> {
        LedgerService::create_ledger(self, name, description, schema).await
    }

    async fn get_ledger(&self, ledger_id: &LedgerId) -> Result<LedgerMetadata, LedgerError> {
        LedgerService::get_ledger(self, ledger_id).await
    }

    async fn list_ledgers(&self) -> Result<Vec<LedgerMetadata>, LedgerError> {
        LedgerService::list_ledgers(self).await
    }

    async fn archive_ledger(&self, ledger_id: &LedgerId) -> Result<(), LedgerError> {
        LedgerService::archive_ledger(self, ledger_id).await
    }

    async fn append(
        &self,
        ledger_id: &LedgerId,
        data: serde_json::Value,
        options: AppendOptions,
    ) -> Result<AppendResult, LedgerError> {
        LedgerService::append(self, ledger_id, data, options).await
    }

    async fn batch_append(
        &self,
        ledger_id: &LedgerId,
        items: Vec<BatchAppendItem>,
    ) -> Result<BatchAppendOutcome, LedgerError> {
        LedgerService::batch_append(self, ledger_id, items).await
    }

    async fn get_entry(
        &self,
        ledger_id: &LedgerId,
        entry_id: &str,
        include_proof: bool,
    ) -> Result<(LedgerEntry, Option<MerkleProof>), LedgerError> {
        LedgerService::get_entry(self, ledger_id, entry_id, include_proof).await
    }

    async fn current_root(&self, ledger_id: &LedgerId) -> Result<Hash, LedgerError> {
        LedgerService::current_root(self, ledger_id).await
    }
}
