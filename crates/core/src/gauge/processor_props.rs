//! Property-based tests for GaugeProcessor.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::gauge::processor::GaugeProcessor;

/// Strategy for proof values between 0.0 and 200.0.
fn arb_proof() -> impl Strategy<Value = Decimal> {
    (0i64..=2000).prop_map(|p| Decimal::new(p, 1))
}

/// Strategy for temperatures between 0.1°F and 130.0°F.
fn arb_temperature() -> impl Strategy<Value = Decimal> {
    (1i64..=1300).prop_map(|t| Decimal::new(t, 1))
}

/// Strategy for volumes up to 100 gallons with three decimals.
fn arb_volume() -> impl Strategy<Value = Decimal> {
    (0i64..=100_000).prop_map(|v| Decimal::new(v, 3))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Derived gallons are non-negative and carry at most two decimals.
    #[test]
    fn prop_outputs_are_two_decimal_and_non_negative(
        proof in arb_proof(),
        temperature in arb_temperature(),
        volume in arb_volume(),
    ) {
        let gauge = GaugeProcessor::new(dec!(0.0004))
            .normalize(proof, temperature, volume)
            .unwrap();
        prop_assert!(gauge.wine_gallons >= Decimal::ZERO);
        prop_assert!(gauge.proof_gallons >= Decimal::ZERO);
        prop_assert!(gauge.wine_gallons.scale() <= 2);
        prop_assert!(gauge.proof_gallons.scale() <= 2);
    }

    /// Proof gallons never exceed twice the wine gallons (200 proof).
    #[test]
    fn prop_proof_gallons_bounded_by_wine_gallons(
        proof in arb_proof(),
        temperature in arb_temperature(),
        volume in arb_volume(),
    ) {
        let gauge = GaugeProcessor::new(dec!(0.0004))
            .normalize(proof, temperature, volume)
            .unwrap();
        prop_assert!(gauge.proof_gallons <= gauge.wine_gallons * dec!(2));
    }

    /// Warmer spirit never yields more wine gallons than cooler spirit.
    #[test]
    fn prop_correction_is_monotonic_in_temperature(
        proof in arb_proof(),
        t1 in arb_temperature(),
        t2 in arb_temperature(),
        volume in arb_volume(),
    ) {
        let processor = GaugeProcessor::new(dec!(0.0004));
        let (cool, warm) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
        let cool_gauge = processor.normalize(proof, cool, volume).unwrap();
        let warm_gauge = processor.normalize(proof, warm, volume).unwrap();
        prop_assert!(warm_gauge.wine_gallons <= cool_gauge.wine_gallons);
    }
}
