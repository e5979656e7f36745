//! Wiring: boots telemetry, constructs a storage dialect from
//! [`LedgerNodeConfig`], and starts the write pipeline and integrity
//! monitor (§2 component 13). No HTTP/P2P transport — the result is a
//! trait object any embedder can call directly or put behind one.

pub mod api;
pub mod config;

use std::sync::Arc;

use ledger_monitor::IntegrityMonitor;
use ledger_storage::{CachedStore, LedgerStore, MemoryStore, SqlStore};

pub use api::LedgerServiceApi;
pub use config::{LedgerNodeConfig, StorageDialect};

/// A booted node: the callable service surface plus the background
/// integrity-monitor task. Dropping this does not stop the monitor task;
/// call [`LedgerNode::shutdown`] for a clean stop.
pub struct LedgerNode {
    pub service: Arc<dyn LedgerServiceApi>,
    monitor_task: tokio::task::JoinHandle<()>,
    _telemetry: ledger_telemetry::TelemetryGuard,
}

impl LedgerNode {
    pub fn shutdown(self) {
        self.monitor_task.abort();
    }
}

fn build_with_store<S: LedgerStore + 'static>(
    store: Arc<CachedStore<S>>,
    config: &LedgerNodeConfig,
) -> (
    Arc<dyn LedgerServiceApi>,
    Arc<IntegrityMonitor<CachedStore<S>>>,
) {
    let monitor = Arc::new(
        IntegrityMonitor::new(store.clone())
            .with_scan_interval_secs(config.integrity_scan_interval_secs),
    );
    let service = Arc::new(
        ledger_service::LedgerService::new(store)
            .with_batch_max_entries(config.batch_max_entries)
            .with_idempotency_ttl_secs(config.idempotency_ttl_secs)
            .with_integrity_monitor(monitor.clone()),
    );
    (service, monitor)
}

/// Boot a node per `config`: connect the chosen storage dialect (wrapped in
/// the caching composite), start the write-pipeline service, install
/// telemetry, and spawn the integrity monitor's scan loop.
pub async fn build(config: LedgerNodeConfig) -> anyhow::Result<LedgerNode> {
    let telemetry = ledger_telemetry::init_telemetry(&ledger_telemetry::TelemetryConfig {
        log_level: config.log_level.clone(),
        ..Default::default()
    })
    .map_err(|e| anyhow::anyhow!(e))?;

    let (service, monitor_task) = match config.storage_dialect {
        StorageDialect::Memory => {
            let store = Arc::new(CachedStore::new(MemoryStore::new()));
            let (service, monitor) = build_with_store(store, &config);
            let task = tokio::spawn(async move { monitor.run().await });
            (service, task)
        }
        StorageDialect::Sql => {
            let url = config
                .sql_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("LEDGER_SQL_URL is required for the sql dialect"))?;
            let store = Arc::new(CachedStore::new(SqlStore::connect(url).await?));
            let (service, monitor) = build_with_store(store, &config);
            let task = tokio::spawn(async move { monitor.run().await });
            (service, task)
        }
    };

    tracing::info!(dialect = ?config.storage_dialect, "ledger node booted");

    Ok(LedgerNode {
        service,
        monitor_task,
        _telemetry: telemetry,
    })
}
