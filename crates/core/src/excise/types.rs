//! Excise domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stillhouse_shared::types::{CompanyId, GaugeRecordId, TaxDeterminationId};

/// Dollar rates per proof gallon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRates {
    /// Rate inside the reduced tier.
    pub reduced_rate: Decimal,
    /// Rate above the reduced tier, or for ineligible companies.
    pub standard_rate: Decimal,
}

/// Everything the calculator needs for one removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExciseInput {
    /// Proof gallons removed.
    pub removal_proof_gallons: Decimal,
    /// Production proof gallons for the year before this removal.
    pub prior_ytd_production_gallons: Decimal,
    /// Whether the company qualifies for the reduced tier.
    pub reduced_rate_eligible: bool,
    /// Annual proof gallons eligible for the reduced rate.
    pub reduced_rate_threshold: Decimal,
}

/// The tier split and tax for one removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    /// Proof gallons removed.
    pub total_proof_gallons: Decimal,
    /// Gallons taxed at the reduced rate.
    pub reduced_rate_gallons: Decimal,
    /// Gallons taxed at the standard rate.
    pub standard_rate_gallons: Decimal,
    /// Tax on the reduced tier, in dollars.
    pub reduced_rate_tax: Decimal,
    /// Tax on the standard tier, in dollars.
    pub standard_rate_tax: Decimal,
    /// Total tax due, in dollars.
    pub total_tax_due: Decimal,
    /// Total tax per proof gallon; zero when nothing was removed.
    pub effective_tax_rate: Decimal,
}

/// A removal to determine tax for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxOrder {
    /// Owning company.
    pub company_id: CompanyId,
    /// Upstream order reference; unique per company.
    pub order_reference: String,
    /// Date of removal.
    pub determination_date: NaiveDate,
    /// Proof gallons removed.
    pub removal_proof_gallons: Decimal,
}

/// A persisted tax determination. Only payment fields change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxDetermination {
    /// Unique identifier.
    pub id: TaxDeterminationId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Upstream order reference.
    pub order_reference: String,
    /// Date of removal.
    pub determination_date: NaiveDate,
    /// Production proof gallons for the year used for the tier split.
    pub prior_ytd_production_gallons: Decimal,
    /// Whether the reduced tier applied.
    pub reduced_rate_eligible: bool,
    /// Threshold used for the tier split.
    pub reduced_rate_threshold: Decimal,
    /// Rates in force at determination.
    pub rates: TaxRates,
    /// Computed split and amounts.
    pub breakdown: TaxBreakdown,
    /// Removal gauges the removed gallons were taken from, if any.
    #[serde(default)]
    pub gauge_ids: Vec<GaugeRecordId>,
    /// Payment reference, once paid.
    pub payment_reference: Option<String>,
    /// Payment date, once paid.
    pub payment_date: Option<NaiveDate>,
    /// When the determination was made.
    pub created_at: DateTime<Utc>,
}

impl TaxDetermination {
    /// Returns true once a payment has been recorded.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_reference.is_some()
    }
}

/// Tax activity for one report period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSummary {
    /// Number of determinations in the period.
    pub determination_count: usize,
    /// Proof gallons across determinations.
    pub determined_proof_gallons: Decimal,
    /// Reduced-tier gallons across determinations.
    pub reduced_rate_gallons: Decimal,
    /// Standard-tier gallons across determinations.
    pub standard_rate_gallons: Decimal,
    /// Tax due as recorded on the determinations.
    pub total_tax_due: Decimal,
    /// Tax due recomputed from each determination's split and rates.
    pub recomputed_tax_due: Decimal,
    /// Tax-determined proof gallons on the ledger for the period.
    pub ledger_tax_determined_gallons: Decimal,
}
