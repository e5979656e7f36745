//! # Core Domain Entities
//!
//! The ledger's wire-level entities, as specified in the data model (§3):
//! `LedgerEntry`, `LedgerMetadata`, and `IdempotencyRecord`.
//!
//! ## Wire conventions
//!
//! `bigint`-typed fields (`position`, `entry_count`) are encoded as decimal
//! strings so they survive round-tripping through JSON without precision
//! loss in non-Rust consumers; timestamps are ISO-8601 UTC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::hash::Hash;

/// Opaque, structured entry payload. The engine never interprets this value;
/// it only canonicalizes and hashes it.
pub type EntryData = serde_json::Value;

/// Unique identifier for a ledger, assigned at creation time.
pub type LedgerId = String;

/// Unique identifier for a committed entry.
pub type EntryId = String;

/// One committed record in a ledger. Immutable once written (§3 invariant d).
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub ledger_id: LedgerId,
    #[serde_as(as = "DisplayFromStr")]
    pub position: u64,
    pub data: EntryData,
    pub hash: Hash,
    pub parent_hash: Hash,
    pub created_at: DateTime<Utc>,
}

/// Metadata describing a ledger: its root, size, and lifecycle state.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerMetadata {
    pub id: LedgerId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub root_hash: Hash,
    #[serde_as(as = "DisplayFromStr")]
    pub entry_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_entry_at: Option<DateTime<Utc>>,
    /// Optional JSON-Schema used to validate `LedgerEntry::data` on append.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
}

impl LedgerMetadata {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

/// A cached response for a previously-seen `(ledger_id, idempotency_key)` pair.
///
/// `cached_response` stores the opaque JSON the service returned the first
/// time, so a retried append can be replayed byte-for-byte (§8 property 8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub ledger_id: LedgerId,
    pub key: String,
    pub cached_response: serde_json::Value,
    /// A content fingerprint of the request payload, used to detect a key
    /// reused with a different payload (`IDEMPOTENCY_CONFLICT`).
    pub request_fingerprint: Hash,
    pub created_at: DateTime<Utc>,
    pub ttl_secs: u64,
}

impl IdempotencyRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.created_at);
        age.num_seconds() > self.ttl_secs as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_round_trips_position_as_decimal_string() {
        let entry = LedgerEntry {
            id: "e1".into(),
            ledger_id: "l1".into(),
            position: 42,
            data: serde_json::json!({"x": 1}),
            hash: Hash::from_hex_unchecked("a".repeat(64)),
            parent_hash: Hash::from_hex_unchecked("b".repeat(64)),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["position"], serde_json::Value::String("42".to_string()));

        let back: LedgerEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back.position, 42);
    }
}
