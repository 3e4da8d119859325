//! Application configuration management.
//!
//! Regulatory figures (tax rates, the reduced-rate threshold) have no
//! defaults: they must come from a config file or the environment.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Compliance engine configuration.
    pub compliance: ComplianceConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Compliance engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ComplianceConfig {
    /// Federal excise tax rates and the reduced-rate threshold.
    pub tax: TaxRateConfig,
    /// Allowed absolute gap, in proof gallons, for the reconciliation identity.
    #[serde(default = "default_reconciliation_tolerance")]
    pub reconciliation_tolerance: Decimal,
    /// Percentage above which a variance is reported as a warning.
    #[serde(default = "default_large_variance_percent")]
    pub large_variance_percent: Decimal,
    /// Gauge normalization settings.
    #[serde(default)]
    pub gauge: GaugeConfig,
    /// Page size used when streaming ledger and audit rows.
    #[serde(default = "default_query_page_size")]
    pub query_page_size: u64,
}

/// Excise tax rate configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TaxRateConfig {
    /// Dollars per proof gallon inside the reduced-rate tier.
    pub reduced_rate: Decimal,
    /// Dollars per proof gallon above the reduced-rate tier.
    pub standard_rate: Decimal,
    /// Annual proof gallons eligible for the reduced rate.
    pub reduced_rate_threshold: Decimal,
}

/// Gauge normalization configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GaugeConfig {
    /// Fractional volume change per degree Fahrenheit away from 60°F.
    #[serde(default = "default_volume_correction")]
    pub volume_correction_per_degree_f: Decimal,
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self {
            volume_correction_per_degree_f: default_volume_correction(),
        }
    }
}

fn default_reconciliation_tolerance() -> Decimal {
    Decimal::new(1, 2) // 0.01 gallons
}

fn default_large_variance_percent() -> Decimal {
    Decimal::TEN
}

fn default_volume_correction() -> Decimal {
    Decimal::new(4, 4) // 0.0004 per °F
}

fn default_query_page_size() -> u64 {
    500
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_filter() -> String {
    "stillhouse=info,sea_orm=warn".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("STILLHOUSE").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
