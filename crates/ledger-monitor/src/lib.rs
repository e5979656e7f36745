//! Cross-checks storage against the ledger invariants independent of the
//! write path: a periodic full scan and a per-append drift check.

pub mod alert;
pub mod monitor;
pub mod report;

pub use alert::{log_alert, AlertType, IntegrityAlert, Severity};
pub use monitor::{IntegrityMonitor, DEFAULT_SCAN_INTERVAL_SECS};
pub use report::ScanReport;
