//! Engine settings derived from [`ComplianceConfig`].

use rust_decimal::Decimal;
use stillhouse_shared::config::ComplianceConfig;
use thiserror::Error;

use crate::excise::TaxRates;
use crate::gauge::GaugeProcessor;
use crate::report::ReportValidator;

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// A value that must not be negative is negative.
    #[error("Invalid setting: {field} = {value} must not be negative")]
    Negative {
        /// Config key.
        field: &'static str,
        /// The rejected value.
        value: Decimal,
    },

    /// Page size is zero.
    #[error("Invalid setting: query_page_size must be positive")]
    ZeroPageSize,
}

/// Validated compliance settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplianceSettings {
    /// Excise rates.
    pub rates: TaxRates,
    /// Reduced-rate threshold used when a profile has no override.
    pub default_threshold: Decimal,
    /// Allowed gap for the reconciliation identity.
    pub reconciliation_tolerance: Decimal,
    /// Loss share of available inventory that raises a warning.
    pub large_variance_percent: Decimal,
    /// Volume correction per °F.
    pub volume_correction_per_degree_f: Decimal,
    /// Rows per page when streaming.
    pub page_size: u64,
}

impl ComplianceSettings {
    /// Validates `config`.
    pub fn from_config(config: &ComplianceConfig) -> Result<Self, SettingsError> {
        for (field, value) in [
            ("tax.reduced_rate", config.tax.reduced_rate),
            ("tax.standard_rate", config.tax.standard_rate),
            ("tax.reduced_rate_threshold", config.tax.reduced_rate_threshold),
            ("reconciliation_tolerance", config.reconciliation_tolerance),
            ("large_variance_percent", config.large_variance_percent),
            (
                "gauge.volume_correction_per_degree_f",
                config.gauge.volume_correction_per_degree_f,
            ),
        ] {
            if value < Decimal::ZERO {
                return Err(SettingsError::Negative { field, value });
            }
        }
        if config.query_page_size == 0 {
            return Err(SettingsError::ZeroPageSize);
        }

        Ok(Self {
            rates: TaxRates {
                reduced_rate: config.tax.reduced_rate,
                standard_rate: config.tax.standard_rate,
            },
            default_threshold: config.tax.reduced_rate_threshold,
            reconciliation_tolerance: config.reconciliation_tolerance,
            large_variance_percent: config.large_variance_percent,
            volume_correction_per_degree_f: config.gauge.volume_correction_per_degree_f,
            page_size: config.query_page_size,
        })
    }

    /// Gauge processor using the configured correction.
    #[must_use]
    pub fn gauge_processor(&self) -> GaugeProcessor {
        GaugeProcessor::new(self.volume_correction_per_degree_f)
    }

    /// Report validator using the configured tolerance and variance.
    #[must_use]
    pub fn report_validator(&self) -> ReportValidator {
        ReportValidator::new(self.reconciliation_tolerance, self.large_variance_percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use stillhouse_shared::config::{GaugeConfig, TaxRateConfig};

    fn config() -> ComplianceConfig {
        ComplianceConfig {
            tax: TaxRateConfig {
                reduced_rate: dec!(2.70),
                standard_rate: dec!(13.50),
                reduced_rate_threshold: dec!(100000),
            },
            reconciliation_tolerance: dec!(0.01),
            large_variance_percent: dec!(10),
            gauge: GaugeConfig::default(),
            query_page_size: 500,
        }
    }

    #[test]
    fn test_from_config() {
        let settings = ComplianceSettings::from_config(&config()).unwrap();
        assert_eq!(settings.rates.standard_rate, dec!(13.50));
        assert_eq!(settings.default_threshold, dec!(100000));
        assert_eq!(settings.volume_correction_per_degree_f, dec!(0.0004));
        assert_eq!(settings.page_size, 500);
    }

    #[test]
    fn test_negative_values_rejected() {
        let mut bad = config();
        bad.tax.standard_rate = dec!(-1);
        assert_eq!(
            ComplianceSettings::from_config(&bad),
            Err(SettingsError::Negative {
                field: "tax.standard_rate",
                value: dec!(-1)
            })
        );

        let mut bad = config();
        bad.query_page_size = 0;
        assert_eq!(
            ComplianceSettings::from_config(&bad),
            Err(SettingsError::ZeroPageSize)
        );
    }
}
