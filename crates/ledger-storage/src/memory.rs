//! In-memory [`LedgerStore`] dialect. Mirrors the teacher's
//! `InMemoryKVStore`: a plain `HashMap` guarded by a lock, enforcing the
//! same invariants a real backend would, for use in unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use ledger_types::{Hash, IdempotencyRecord, LedgerEntry, LedgerError, LedgerId, LedgerMetadata};
use tokio::sync::RwLock;

use crate::port::LedgerStore;

#[derive(Default)]
struct State {
    ledgers: HashMap<LedgerId, LedgerMetadata>,
    entries: HashMap<LedgerId, Vec<LedgerEntry>>,
    idempotency: HashMap<(LedgerId, String), IdempotencyRecord>,
}

/// In-memory storage dialect. Not durable; state is lost on process exit.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn create_ledger(&self, metadata: &LedgerMetadata) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        state.entries.entry(metadata.id.clone()).or_default();
        state.ledgers.insert(metadata.id.clone(), metadata.clone());
        Ok(())
    }

    async fn get_ledger(&self, ledger_id: &LedgerId) -> Result<Option<LedgerMetadata>, LedgerError> {
        let state = self.state.read().await;
        Ok(state.ledgers.get(ledger_id).cloned())
    }

    async fn list_ledgers(&self) -> Result<Vec<LedgerMetadata>, LedgerError> {
        let state = self.state.read().await;
        let mut ledgers: Vec<_> = state.ledgers.values().cloned().collect();
        ledgers.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(ledgers)
    }

    async fn archive_ledger(&self, ledger_id: &LedgerId) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        let metadata = state
            .ledgers
            .get_mut(ledger_id)
            .ok_or_else(|| LedgerError::LedgerNotFound {
                ledger_id: ledger_id.clone(),
            })?;
        metadata.archived_at = Some(Utc::now());
        Ok(())
    }

    async fn commit_append(&self, entry: &LedgerEntry, new_root: Hash) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;

        let metadata = state
            .ledgers
            .get(&entry.ledger_id)
            .ok_or_else(|| LedgerError::LedgerNotFound {
                ledger_id: entry.ledger_id.clone(),
            })?;
        if metadata.is_archived() {
            return Err(LedgerError::Archived {
                ledger_id: entry.ledger_id.clone(),
            });
        }

        let entries = state.entries.entry(entry.ledger_id.clone()).or_default();
        let expected = entries.len() as u64;
        if entry.position != expected {
            return Err(LedgerError::SequenceViolation {
                ledger_id: entry.ledger_id.clone(),
                expected,
                actual: entry.position,
            });
        }
        if entries.iter().any(|e| e.position == entry.position) {
            return Err(LedgerError::DuplicatePosition {
                ledger_id: entry.ledger_id.clone(),
                position: entry.position,
            });
        }

        let expected_parent = entries
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(Hash::genesis);
        if entry.parent_hash != expected_parent {
            return Err(LedgerError::ChainIntegrityViolation {
                ledger_id: entry.ledger_id.clone(),
                position: entry.position,
                expected: expected_parent,
                actual: entry.parent_hash.clone(),
            });
        }
        if Hash::from_hex(entry.hash.as_str()).is_err() {
            return Err(LedgerError::ValidationError {
                field: "hash".to_string(),
                message: format!("entry hash `{}` is not well-formed", entry.hash.as_str()),
            });
        }

        entries.push(entry.clone());
        let entry_count = entries.len() as u64;

        let metadata = state.ledgers.get_mut(&entry.ledger_id).expect("checked above");
        metadata.root_hash = new_root;
        metadata.entry_count = entry_count;
        metadata.last_entry_at = Some(entry.created_at);

        Ok(())
    }

    async fn get_entry(
        &self,
        ledger_id: &LedgerId,
        entry_id: &str,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .get(ledger_id)
            .and_then(|entries| entries.iter().find(|e| e.id == entry_id))
            .cloned())
    }

    async fn get_entry_by_position(
        &self,
        ledger_id: &LedgerId,
        position: u64,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .get(ledger_id)
            .and_then(|entries| entries.get(position as usize))
            .cloned())
    }

    async fn list_entries(
        &self,
        ledger_id: &LedgerId,
        from_position: u64,
        limit: u64,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let state = self.state.read().await;
        let entries = state.entries.get(ledger_id).cloned().unwrap_or_default();
        Ok(entries
            .into_iter()
            .filter(|e| e.position >= from_position)
            .take(limit.max(1) as usize)
            .collect())
    }

    async fn entry_count(&self, ledger_id: &LedgerId) -> Result<u64, LedgerError> {
        let state = self.state.read().await;
        Ok(state.entries.get(ledger_id).map(Vec::len).unwrap_or(0) as u64)
    }

    async fn get_idempotency_record(
        &self,
        ledger_id: &LedgerId,
        key: &str,
    ) -> Result<Option<IdempotencyRecord>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .idempotency
            .get(&(ledger_id.clone(), key.to_string()))
            .cloned())
    }

    async fn put_idempotency_record(&self, record: &IdempotencyRecord) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        state
            .idempotency
            .insert((record.ledger_id.clone(), record.key.clone()), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_types::GENESIS_HASH;

    fn sample_metadata(id: &str) -> LedgerMetadata {
        LedgerMetadata {
            id: id.to_string(),
            name: "test".to_string(),
            description: None,
            created_at: Utc::now(),
            root_hash: Hash::from_hex_unchecked(GENESIS_HASH),
            entry_count: 0,
            last_entry_at: None,
            schema: None,
            archived_at: None,
        }
    }

    fn sample_entry(ledger_id: &str, position: u64) -> LedgerEntry {
        LedgerEntry {
            id: format!("entry-{position}"),
            ledger_id: ledger_id.to_string(),
            position,
            data: serde_json::json!({"n": position}),
            hash: Hash::from_hex_unchecked(hex::encode([position as u8; 32])),
            parent_hash: Hash::from_hex_unchecked(GENESIS_HASH),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn append_enforces_sequence_monotonicity() {
        let store = MemoryStore::new();
        store.create_ledger(&sample_metadata("l1")).await.unwrap();
        store
            .commit_append(&sample_entry("l1", 0), Hash::from_hex_unchecked(GENESIS_HASH))
            .await
            .unwrap();

        let out_of_order = store
            .commit_append(&sample_entry("l1", 5), Hash::from_hex_unchecked(GENESIS_HASH))
            .await;
        assert!(matches!(
            out_of_order,
            Err(LedgerError::SequenceViolation { expected: 1, actual: 5, .. })
        ));
    }

    #[tokio::test]
    async fn append_enforces_the_parent_hash_chain() {
        let store = MemoryStore::new();
        store.create_ledger(&sample_metadata("l1")).await.unwrap();

        let mut forged = sample_entry("l1", 0);
        forged.parent_hash = Hash::from_hex_unchecked(hex::encode([0xab; 32]));

        let result = store.commit_append(&forged, Hash::from_hex_unchecked(GENESIS_HASH)).await;
        assert!(matches!(
            result,
            Err(LedgerError::ChainIntegrityViolation { position: 0, .. })
        ));
    }

    #[tokio::test]
    async fn archived_ledger_rejects_appends() {
        let store = MemoryStore::new();
        store.create_ledger(&sample_metadata("l1")).await.unwrap();
        store.archive_ledger(&"l1".to_string()).await.unwrap();

        let result = store
            .commit_append(&sample_entry("l1", 0), Hash::from_hex_unchecked(GENESIS_HASH))
            .await;
        assert!(matches!(result, Err(LedgerError::Archived { .. })));
    }

    #[tokio::test]
    async fn get_entry_by_position_round_trips() {
        let store = MemoryStore::new();
        store.create_ledger(&sample_metadata("l1")).await.unwrap();
        let entry = sample_entry("l1", 0);
        store
            .commit_append(&entry, Hash::from_hex_unchecked(GENESIS_HASH))
            .await
            .unwrap();

        let fetched = store
            .get_entry_by_position(&"l1".to_string(), 0)
            .await
            .unwrap();
        assert_eq!(fetched.unwrap().id, entry.id);
    }
}
