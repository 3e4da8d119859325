//! Company compliance profile.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use stillhouse_shared::types::CompanyId;

use crate::company::schedule::ReportSchedule;

/// The regulator form a company files each month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormType {
    /// Monthly report of storage operations.
    MonthlyStorage,
    /// Monthly report of production operations.
    MonthlyProduction,
    /// Monthly report of processing operations.
    MonthlyProcessing,
}

impl FormType {
    /// Returns the string representation of the form type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MonthlyStorage => "monthly_storage",
            Self::MonthlyProduction => "monthly_production",
            Self::MonthlyProcessing => "monthly_processing",
        }
    }

    /// Parses a form type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monthly_storage" => Some(Self::MonthlyStorage),
            "monthly_production" => Some(Self::MonthlyProduction),
            "monthly_processing" => Some(Self::MonthlyProcessing),
            _ => None,
        }
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Regulatory settings for one company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    /// The company.
    pub company_id: CompanyId,
    /// Registered legal name.
    pub legal_name: String,
    /// Distilled spirits plant permit or registry number.
    pub permit_number: Option<String>,
    /// Employer identification number.
    pub employer_id: Option<String>,
    /// Whether the company qualifies for the reduced excise rate.
    pub reduced_rate_eligible: bool,
    /// Per-company override of the reduced-rate threshold.
    pub reduced_rate_threshold: Option<Decimal>,
    /// Report form filed each month.
    pub report_form: FormType,
    /// Automatic generation schedule.
    pub schedule: Option<ReportSchedule>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl CompanyProfile {
    /// Creates a profile with no identifiers, schedule or reduced rate.
    #[must_use]
    pub fn new(
        company_id: CompanyId,
        legal_name: impl Into<String>,
        report_form: FormType,
    ) -> Self {
        Self {
            company_id,
            legal_name: legal_name.into(),
            permit_number: None,
            employer_id: None,
            reduced_rate_eligible: false,
            reduced_rate_threshold: None,
            report_form,
            schedule: None,
            updated_at: Utc::now(),
        }
    }

    /// Names of regulatory identifiers that are missing or blank.
    #[must_use]
    pub fn missing_identifiers(&self) -> Vec<&'static str> {
        [
            ("permit_number", &self.permit_number),
            ("employer_id", &self.employer_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
        .map(|(field, _)| field)
        .collect()
    }

    /// The reduced-rate threshold for this company.
    #[must_use]
    pub fn threshold_or(&self, default: Decimal) -> Decimal {
        self.reduced_rate_threshold.unwrap_or(default)
    }
}
