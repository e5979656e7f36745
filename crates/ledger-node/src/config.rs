//! `LedgerNodeConfig`: `LEDGER_*` env overrides with documented defaults (§6).

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageDialect {
    Memory,
    Sql,
}

impl StorageDialect {
    fn parse(raw: &str) -> Self {
        match raw {
            "sql" => StorageDialect::Sql,
            _ => StorageDialect::Memory,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerNodeConfig {
    pub storage_dialect: StorageDialect,
    pub sql_url: Option<String>,
    pub idempotency_ttl_secs: u64,
    pub integrity_scan_interval_secs: u64,
    pub batch_max_entries: usize,
    pub proof_base_url: String,
    pub log_level: String,
}

impl Default for LedgerNodeConfig {
    fn default() -> Self {
        Self {
            storage_dialect: StorageDialect::Memory,
            sql_url: None,
            idempotency_ttl_secs: 86_400,
            integrity_scan_interval_secs: 3600,
            batch_max_entries: 1000,
            proof_base_url: "https://verify.veilchain.example".to_string(),
            log_level: "info".to_string(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl LedgerNodeConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            storage_dialect: StorageDialect::parse(&env_or("LEDGER_STORAGE_DIALECT", "memory")),
            sql_url: std::env::var("LEDGER_SQL_URL").ok(),
            idempotency_ttl_secs: env_parsed(
                "LEDGER_IDEMPOTENCY_TTL_SECS",
                defaults.idempotency_ttl_secs,
            ),
            integrity_scan_interval_secs: env_parsed(
                "LEDGER_INTEGRITY_SCAN_INTERVAL_SECS",
                defaults.integrity_scan_interval_secs,
            ),
            batch_max_entries: env_parsed("LEDGER_BATCH_MAX_ENTRIES", defaults.batch_max_entries),
            proof_base_url: env_or("LEDGER_PROOF_BASE_URL", &defaults.proof_base_url),
            log_level: env_or("LEDGER_LOG_LEVEL", &defaults.log_level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = LedgerNodeConfig::default();
        assert_eq!(config.storage_dialect, StorageDialect::Memory);
        assert_eq!(config.idempotency_ttl_secs, 86_400);
        assert_eq!(config.integrity_scan_interval_secs, 3600);
        assert_eq!(config.batch_max_entries, 1000);
    }

    #[test]
    fn unrecognized_dialect_string_falls_back_to_memory() {
        assert_eq!(StorageDialect::parse("carrier-pigeon"), StorageDialect::Memory);
    }
}
