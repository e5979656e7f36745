//! Alert shapes dispatched by the integrity monitor (§4.7 "Alert dispatch").

use chrono::{DateTime, Utc};
use ledger_types::{Hash, LedgerId};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

/// One of the four distinct failure kinds the full scan checks for, plus
/// the per-append drift check (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertType {
    ChainBreak,
    SequenceGap,
    MerkleMismatch,
    HashInvalid,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::ChainBreak => "CHAIN_BREAK",
            AlertType::SequenceGap => "SEQUENCE_GAP",
            AlertType::MerkleMismatch => "MERKLE_MISMATCH",
            AlertType::HashInvalid => "HASH_INVALID",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntegrityAlert {
    pub id: String,
    pub ledger_id: LedgerId,
    pub severity: Severity,
    pub alert_type: AlertType,
    pub message: String,
    pub position: Option<u64>,
    pub expected: Option<Hash>,
    pub actual: Option<Hash>,
    pub detected_at: DateTime<Utc>,
}

impl IntegrityAlert {
    pub fn new(ledger_id: LedgerId, alert_type: AlertType, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ledger_id,
            severity: Severity::Critical,
            alert_type,
            message: message.into(),
            position: None,
            expected: None,
            actual: None,
            detected_at: Utc::now(),
        }
    }

    pub fn at_position(mut self, position: u64) -> Self {
        self.position = Some(position);
        self
    }

    pub fn expecting(mut self, expected: Hash, actual: Hash) -> Self {
        self.expected = Some(expected);
        self.actual = Some(actual);
        self
    }
}

/// The default dispatch target: `tracing::error!` at the alert's severity.
/// §4.7 names all four full-scan alert types CRITICAL; `verify_entry`
/// drift is also surfaced at CRITICAL since it indicates storage-vs-tree
/// divergence after a committed write.
pub fn log_alert(alert: &IntegrityAlert) {
    match alert.severity {
        Severity::Critical => tracing::error!(
            alert_id = %alert.id,
            ledger_id = %alert.ledger_id,
            alert_type = alert.alert_type.as_str(),
            position = ?alert.position,
            expected = ?alert.expected,
            actual = ?alert.actual,
            "{}",
            alert.message
        ),
        Severity::Warning => tracing::warn!(
            alert_id = %alert.id,
            ledger_id = %alert.ledger_id,
            alert_type = alert.alert_type.as_str(),
            "{}",
            alert.message
        ),
        Severity::Info => tracing::info!(
            alert_id = %alert.id,
            ledger_id = %alert.ledger_id,
            alert_type = alert.alert_type.as_str(),
            "{}",
            alert.message
        ),
    }
}
