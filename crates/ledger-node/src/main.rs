//! The `ledger-node` executable: boots a node per `LEDGER_*` env vars and
//! waits for a shutdown signal. No HTTP/P2P transport is attached — this
//! binary exists to prove the wiring, not to serve requests.

use ledger_node::{build, LedgerNodeConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = LedgerNodeConfig::from_env();
    let node = build(config).await?;

    tracing::info!("node running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    node.shutdown();

    Ok(())
}
