//! Two-tier excise tax calculation.
//!
//! An eligible company pays the reduced rate on removals until its annual
//! production reaches the threshold; everything above it, and every gallon
//! removed by an ineligible company, pays the standard rate.

use rust_decimal::Decimal;
use stillhouse_shared::types::{round_currency, round_gallons, round_rate};

use crate::excise::error::ExciseError;
use crate::excise::types::{ExciseInput, TaxBreakdown, TaxDetermination, TaxRates, TaxSummary};

/// Stateless excise tax calculator.
pub struct ExciseCalculator;

impl ExciseCalculator {
    /// Splits a removal across the rate tiers and prices it.
    ///
    /// Removed gallons are rounded to two decimals, each tier's tax to cents
    /// (banker's rounding) and the effective rate to four decimals.
    ///
    /// # Errors
    ///
    /// Returns `ExciseError::InvalidQuantity` for negative gallons or
    /// threshold, and `ExciseError::InvalidRate` for negative rates.
    pub fn calculate(input: &ExciseInput, rates: &TaxRates) -> Result<TaxBreakdown, ExciseError> {
        Self::validate_rates(rates)?;
        for (field, value) in [
            ("removal_proof_gallons", input.removal_proof_gallons),
            ("prior_ytd_production_gallons", input.prior_ytd_production_gallons),
            ("reduced_rate_threshold", input.reduced_rate_threshold),
        ] {
            if value < Decimal::ZERO {
                return Err(ExciseError::InvalidQuantity { field, value });
            }
        }

        let total = round_gallons(input.removal_proof_gallons);
        let reduced = if input.reduced_rate_eligible {
            let remaining = (input.reduced_rate_threshold - input.prior_ytd_production_gallons)
                .max(Decimal::ZERO);
            round_gallons(total.min(remaining))
        } else {
            Decimal::ZERO
        };

        Ok(Self::price(reduced, total - reduced, rates))
    }

    /// Prices an already split removal.
    #[must_use]
    pub fn price(
        reduced_rate_gallons: Decimal,
        standard_rate_gallons: Decimal,
        rates: &TaxRates,
    ) -> TaxBreakdown {
        let total_proof_gallons = reduced_rate_gallons + standard_rate_gallons;
        let reduced_rate_tax = round_currency(reduced_rate_gallons * rates.reduced_rate);
        let standard_rate_tax = round_currency(standard_rate_gallons * rates.standard_rate);
        let total_tax_due = reduced_rate_tax + standard_rate_tax;
        let effective_tax_rate = if total_proof_gallons.is_zero() {
            Decimal::ZERO
        } else {
            round_rate(total_tax_due / total_proof_gallons)
        };

        TaxBreakdown {
            total_proof_gallons,
            reduced_rate_gallons,
            standard_rate_gallons,
            reduced_rate_tax,
            standard_rate_tax,
            total_tax_due,
            effective_tax_rate,
        }
    }

    /// Reprices a persisted determination from its own split and rates.
    #[must_use]
    pub fn recompute(determination: &TaxDetermination) -> TaxBreakdown {
        Self::price(
            determination.breakdown.reduced_rate_gallons,
            determination.breakdown.standard_rate_gallons,
            &determination.rates,
        )
    }

    /// Totals a period's determinations against its ledger removals.
    #[must_use]
    pub fn summarize(
        determinations: &[TaxDetermination],
        ledger_tax_determined_gallons: Decimal,
    ) -> TaxSummary {
        determinations.iter().fold(
            TaxSummary {
                ledger_tax_determined_gallons,
                ..TaxSummary::default()
            },
            |mut summary, d| {
                summary.determination_count += 1;
                summary.determined_proof_gallons += d.breakdown.total_proof_gallons;
                summary.reduced_rate_gallons += d.breakdown.reduced_rate_gallons;
                summary.standard_rate_gallons += d.breakdown.standard_rate_gallons;
                summary.total_tax_due += d.breakdown.total_tax_due;
                summary.recomputed_tax_due += Self::recompute(d).total_tax_due;
                summary
            },
        )
    }

    /// Rejects negative rates.
    pub fn validate_rates(rates: &TaxRates) -> Result<(), ExciseError> {
        for (field, value) in [
            ("reduced_rate", rates.reduced_rate),
            ("standard_rate", rates.standard_rate),
        ] {
            if value < Decimal::ZERO {
                return Err(ExciseError::InvalidRate { field, value });
            }
        }
        Ok(())
    }
}
