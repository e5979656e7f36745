//! `verify_integrity(ledger)` result shape (§4.5 table, §4.7 full scan).

use ledger_types::LedgerId;

use crate::alert::IntegrityAlert;

/// A snapshot the caller may persist or export; not itself persisted by
/// the monitor.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub ledger_id: LedgerId,
    pub is_valid: bool,
    pub chain_valid: bool,
    pub sequence_valid: bool,
    pub entry_count: u64,
    pub errors: Vec<IntegrityAlert>,
}

impl ScanReport {
    pub fn clean(ledger_id: LedgerId, entry_count: u64) -> Self {
        Self {
            ledger_id,
            is_valid: true,
            chain_valid: true,
            sequence_valid: true,
            entry_count,
            errors: Vec::new(),
        }
    }
}
