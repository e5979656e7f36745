//! Telemetry configuration, read from `LEDGER_*` env vars (§6).

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "veilchain-ledger".to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Reads `LEDGER_LOG_LEVEL` (default `info`) and `LEDGER_LOG_JSON`
    /// (default `false`, any value other than `1`/`true` is false).
    pub fn from_env() -> Self {
        let log_level =
            std::env::var("LEDGER_LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
        let json_logs = std::env::var("LEDGER_LOG_JSON")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            log_level,
            json_logs,
            ..Default::default()
        }
    }
}
