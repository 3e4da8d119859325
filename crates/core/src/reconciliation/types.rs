//! Reconciliation types.
//!
//! Every line satisfies
//! `opening + production + transfers_in + gains - transfers_out - losses = closing`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stillhouse_shared::types::{CompanyId, ReportId};

use crate::excise::TaxSummary;
use crate::ledger::SpiritsClass;
use crate::period::ReportPeriod;

/// The partition key of a reconciliation line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    /// Free-form product code.
    pub product_type: String,
    /// Spirits class.
    pub spirits_class: SpiritsClass,
}

/// How removals (transfers out) were disposed of.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalBreakdown {
    /// Shipped in bond to another premises.
    pub transferred_in_bond: Decimal,
    /// Removed on determination of tax.
    pub tax_determined: Decimal,
    /// Destroyed.
    pub destroyed: Decimal,
}

impl RemovalBreakdown {
    /// Sum of all removal kinds.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.transferred_in_bond + self.tax_determined + self.destroyed
    }
}

/// Proof-gallon balances for one product and spirits class over a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationLine {
    /// Free-form product code.
    pub product_type: String,
    /// Spirits class.
    pub spirits_class: SpiritsClass,
    /// Prior month's closing balance.
    pub opening: Decimal,
    /// Produced this month.
    pub production: Decimal,
    /// Received in bond.
    pub transfers_in: Decimal,
    /// Inventory gains.
    pub gains: Decimal,
    /// All removals.
    pub transfers_out: Decimal,
    /// Inventory losses.
    pub losses: Decimal,
    /// Derived closing balance.
    pub closing: Decimal,
    /// Detail of `transfers_out`.
    pub removals: RemovalBreakdown,
    /// Bottled this month; informational, no balance effect.
    pub bottled: Decimal,
}

impl ReconciliationLine {
    /// A line with nothing but an opening balance.
    #[must_use]
    pub fn opening(key: GroupKey, opening: Decimal) -> Self {
        Self {
            product_type: key.product_type,
            spirits_class: key.spirits_class,
            opening,
            production: Decimal::ZERO,
            transfers_in: Decimal::ZERO,
            gains: Decimal::ZERO,
            transfers_out: Decimal::ZERO,
            losses: Decimal::ZERO,
            closing: opening,
            removals: RemovalBreakdown::default(),
            bottled: Decimal::ZERO,
        }
    }

    /// The line's partition key.
    #[must_use]
    pub fn key(&self) -> GroupKey {
        GroupKey {
            product_type: self.product_type.clone(),
            spirits_class: self.spirits_class,
        }
    }

    /// Inventory available before removals and losses.
    #[must_use]
    pub fn available(&self) -> Decimal {
        self.opening + self.production + self.transfers_in + self.gains
    }

    /// The closing balance implied by the line's sections.
    #[must_use]
    pub fn expected_closing(&self) -> Decimal {
        self.available() - self.transfers_out - self.losses
    }

    /// Absolute gap between the stored and implied closing balance.
    #[must_use]
    pub fn imbalance(&self) -> Decimal {
        (self.closing - self.expected_closing()).abs()
    }
}

/// Where a report's opening balances came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OpeningSource {
    /// Closing balances of the previous period's report.
    PriorReport {
        /// The previous report.
        report_id: ReportId,
        /// Its period.
        period: ReportPeriod,
    },
    /// No previous report; openings are zero.
    None,
}

/// The computed content of a monthly report, snapshotted at generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyReportData {
    /// Reporting company.
    pub company_id: CompanyId,
    /// Reporting period.
    pub period: ReportPeriod,
    /// One line per product and spirits class, in key order.
    pub lines: Vec<ReconciliationLine>,
    /// Source of the opening balances.
    pub opening_source: OpeningSource,
    /// Tax activity in the period.
    pub tax_summary: TaxSummary,
}

impl MonthlyReportData {
    /// Total tax-determined proof gallons across lines.
    #[must_use]
    pub fn tax_determined_gallons(&self) -> Decimal {
        self.lines.iter().map(|l| l.removals.tax_determined).sum()
    }
}
