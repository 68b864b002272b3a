use std::{fs, path::PathBuf};

use meter_client::domain::{DuplicateDatePolicy, MeterTopology, TariffConfig};
use serde::Deserialize;

use crate::pipeline::MeterSelection;
use crate::sinks::{CsvDailySink, JsonReportSink, ReportSink, ReportTarget};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    pub topology: MeterTopology,
    pub duplicate_dates: DuplicateDatePolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http_bind_addr: String,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_bind_addr: "0.0.0.0:8080".to_string(),
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub kind: ReportKind,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    pub tariff: Option<TariffConfig>,
    #[serde(default)]
    pub allocation: AllocationConfig,
    pub meters: Option<MeterSelection>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub report: ReportConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("ALLOCATION_CONFIG").unwrap_or_else(|_| "allocation-config.toml".to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config '{path}': {e}"))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }
}

impl ReportConfig {
    /// The report sink selected by `[report]`.
    pub fn sink(&self) -> ReportSink {
        let target = ReportTarget::from_path(self.path.clone());
        match self.kind {
            ReportKind::Json => ReportSink::Json(JsonReportSink::new(target)),
            ReportKind::Csv => ReportSink::Csv(CsvDailySink::new(target)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_client::domain::MeterIdentity;

    #[test]
    fn parses_full_config() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [tariff]
            price_neighbor = 0.10
            price_grid = 0.08
            price_grid_buy = 0.30

            [allocation]
            topology = "net_of_self_consumption"
            duplicate_dates = "reject"

            [meters]
            production = { serial = "CH1", stream_code = "1-1:2.29.0" }
            owner = { serial = "CH1", stream_code = "1-1:1.29.0" }
            neighbor = { serial = "CH2", stream_code = "1-1:1.29.0" }

            [server]
            http_bind_addr = "127.0.0.1:9999"

            [report]
            kind = "csv"
            path = "daily.csv"

            [metrics]
            bind_addr = "127.0.0.1:9000"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.tariff, Some(TariffConfig::new(0.10, 0.08, 0.30)));
        assert_eq!(cfg.allocation.topology, MeterTopology::NetOfSelfConsumption);
        assert_eq!(cfg.allocation.duplicate_dates, DuplicateDatePolicy::Reject);
        let meters = cfg.meters.unwrap();
        assert_eq!(meters.neighbor, MeterIdentity::new("CH2", "1-1:1.29.0"));
        assert_eq!(cfg.server.http_bind_addr, "127.0.0.1:9999");
        assert_eq!(cfg.server.max_body_bytes, 16 * 1024 * 1024);
        assert_eq!(cfg.report.kind, ReportKind::Csv);
        assert_eq!(cfg.report.path, Some(PathBuf::from("daily.csv")));
        assert!(cfg.metrics.is_some());
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = AppConfig::from_toml_str("").unwrap();
        assert!(cfg.tariff.is_none());
        assert!(cfg.meters.is_none());
        assert_eq!(cfg.allocation.topology, MeterTopology::Gross);
        assert_eq!(cfg.allocation.duplicate_dates, DuplicateDatePolicy::KeepLast);
        assert_eq!(cfg.report.kind, ReportKind::Json);
        assert!(matches!(cfg.report.sink(), ReportSink::Json(_)));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let err = AppConfig::from_toml_str("[allocation]\nduplicate_dates = \"merge\"\n");
        assert!(err.is_err());
    }
}
