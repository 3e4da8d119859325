//! Property-based tests for ExciseCalculator.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::excise::calculator::ExciseCalculator;
use crate::excise::types::{ExciseInput, TaxRates};

/// Strategy for gallon quantities with two decimals, up to 500,000.
fn arb_gallons() -> impl Strategy<Value = Decimal> {
    (0i64..=50_000_000).prop_map(|g| Decimal::new(g, 2))
}

/// Strategy for rates between 0.00 and 20.00.
fn arb_rate() -> impl Strategy<Value = Decimal> {
    (0i64..=2000).prop_map(|r| Decimal::new(r, 2))
}

fn arb_input() -> impl Strategy<Value = ExciseInput> {
    (arb_gallons(), arb_gallons(), any::<bool>(), arb_gallons()).prop_map(
        |(removal, prior, eligible, threshold)| ExciseInput {
            removal_proof_gallons: removal,
            prior_ytd_production_gallons: prior,
            reduced_rate_eligible: eligible,
            reduced_rate_threshold: threshold,
        },
    )
}

fn arb_rates() -> impl Strategy<Value = TaxRates> {
    (arb_rate(), arb_rate()).prop_map(|(reduced_rate, standard_rate)| TaxRates {
        reduced_rate,
        standard_rate,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The tiers partition the removal exactly.
    #[test]
    fn prop_tiers_partition_removal(input in arb_input(), rates in arb_rates()) {
        let tax = ExciseCalculator::calculate(&input, &rates).unwrap();
        prop_assert_eq!(
            tax.reduced_rate_gallons + tax.standard_rate_gallons,
            input.removal_proof_gallons
        );
        prop_assert!(tax.reduced_rate_gallons >= Decimal::ZERO);
        prop_assert!(tax.standard_rate_gallons >= Decimal::ZERO);
    }

    /// The reduced tier never exceeds what is left of the threshold.
    #[test]
    fn prop_reduced_tier_bounded_by_remaining_threshold(
        input in arb_input(),
        rates in arb_rates(),
    ) {
        let tax = ExciseCalculator::calculate(&input, &rates).unwrap();
        let remaining = (input.reduced_rate_threshold - input.prior_ytd_production_gallons)
            .max(Decimal::ZERO);
        prop_assert!(tax.reduced_rate_gallons <= remaining);
        if !input.reduced_rate_eligible {
            prop_assert_eq!(tax.reduced_rate_gallons, Decimal::ZERO);
        }
    }

    /// The total is the sum of the tier amounts, each rounded to cents.
    #[test]
    fn prop_total_is_sum_of_tiers(input in arb_input(), rates in arb_rates()) {
        let tax = ExciseCalculator::calculate(&input, &rates).unwrap();
        prop_assert_eq!(tax.total_tax_due, tax.reduced_rate_tax + tax.standard_rate_tax);
        prop_assert!(tax.reduced_rate_tax.scale() <= 2);
        prop_assert!(tax.standard_rate_tax.scale() <= 2);
        prop_assert!(tax.effective_tax_rate.scale() <= 4);
    }

    /// Eligibility never increases the tax when the reduced rate is lower.
    #[test]
    fn prop_eligibility_never_costs_more(input in arb_input(), reduced in 0i64..20) {
        // Whole-dollar rates keep every amount exact at cents.
        let reduced = Decimal::from(reduced);
        let rates = TaxRates { reduced_rate: reduced, standard_rate: reduced + dec!(1) };
        let eligible = ExciseCalculator::calculate(
            &ExciseInput { reduced_rate_eligible: true, ..input },
            &rates,
        ).unwrap();
        let ineligible = ExciseCalculator::calculate(
            &ExciseInput { reduced_rate_eligible: false, ..input },
            &rates,
        ).unwrap();
        prop_assert!(eligible.total_tax_due <= ineligible.total_tax_due);
    }
}
