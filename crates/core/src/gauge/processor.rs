//! Gauge normalization.
//!
//! Observed volume is corrected to the 60°F reference with a linear
//! expansion coefficient; proof gallons are then derived from the rounded
//! wine gallons so both figures reconcile on paper.

use rust_decimal::Decimal;
use stillhouse_shared::types::round_gallons;

use crate::gauge::error::GaugeError;
use crate::gauge::types::NormalizedGauge;

/// Reference temperature for wine gallons, in °F.
pub const REFERENCE_TEMPERATURE_F: Decimal = Decimal::from_parts(60, 0, 0, false, 0);

/// Highest proof a spirit can have.
pub const MAX_PROOF: Decimal = Decimal::from_parts(200, 0, 0, false, 0);

/// Highest accepted gauging temperature, in °F.
pub const MAX_TEMPERATURE_F: Decimal = Decimal::from_parts(130, 0, 0, false, 0);

/// Converts raw barrel measurements into wine and proof gallons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaugeProcessor {
    volume_correction_per_degree_f: Decimal,
}

impl GaugeProcessor {
    /// Creates a processor using `volume_correction_per_degree_f` as the
    /// fractional volume change per degree away from 60°F.
    #[must_use]
    pub const fn new(volume_correction_per_degree_f: Decimal) -> Self {
        Self {
            volume_correction_per_degree_f,
        }
    }

    /// Validates a measurement and derives its gallons.
    ///
    /// # Errors
    ///
    /// Returns `GaugeError::InvalidMeasurement` if proof is outside
    /// `[0, 200]`, temperature is not within `(0, 130]` °F, or volume is
    /// negative.
    pub fn normalize(
        &self,
        proof: Decimal,
        temperature_f: Decimal,
        volume_gallons: Decimal,
    ) -> Result<NormalizedGauge, GaugeError> {
        if proof < Decimal::ZERO || proof > MAX_PROOF {
            return Err(GaugeError::InvalidMeasurement {
                field: "proof",
                value: proof,
                reason: "must be between 0 and 200",
            });
        }
        if temperature_f <= Decimal::ZERO || temperature_f > MAX_TEMPERATURE_F {
            return Err(GaugeError::InvalidMeasurement {
                field: "temperature_f",
                value: temperature_f,
                reason: "must be above 0 and at most 130",
            });
        }
        if volume_gallons < Decimal::ZERO {
            return Err(GaugeError::InvalidMeasurement {
                field: "volume_gallons",
                value: volume_gallons,
                reason: "must not be negative",
            });
        }

        let correction = Decimal::ONE
            - self.volume_correction_per_degree_f * (temperature_f - REFERENCE_TEMPERATURE_F);
        let wine_gallons = round_gallons((volume_gallons * correction).max(Decimal::ZERO));
        let proof_gallons = round_gallons(wine_gallons * proof / Decimal::ONE_HUNDRED);

        Ok(NormalizedGauge {
            wine_gallons,
            proof_gallons,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn processor() -> GaugeProcessor {
        GaugeProcessor::new(dec!(0.0004))
    }

    #[test]
    fn test_reference_temperature_keeps_volume() {
        let gauge = processor().normalize(dec!(100), dec!(60), dec!(53.125)).unwrap();
        assert_eq!(gauge.wine_gallons, dec!(53.12));
        assert_eq!(gauge.proof_gallons, dec!(53.12));
    }

    #[test]
    fn test_warm_spirit_is_corrected_down() {
        let gauge = processor().normalize(dec!(120), dec!(70), dec!(50)).unwrap();
        assert_eq!(gauge.wine_gallons, dec!(49.80));
        assert_eq!(gauge.proof_gallons, dec!(59.76));
    }

    #[test]
    fn test_cold_spirit_is_corrected_up() {
        let gauge = processor().normalize(dec!(110), dec!(50), dec!(50)).unwrap();
        assert_eq!(gauge.wine_gallons, dec!(50.20));
        assert_eq!(gauge.proof_gallons, dec!(55.22));
    }

    #[test]
    fn test_proof_gallons_use_rounded_wine_gallons() {
        // 10.005 rounds to 10.00 before proof is applied.
        let gauge = processor().normalize(dec!(150), dec!(60), dec!(10.005)).unwrap();
        assert_eq!(gauge.wine_gallons, dec!(10.00));
        assert_eq!(gauge.proof_gallons, dec!(15.00));
    }

    #[test]
    fn test_boundaries_are_accepted() {
        assert!(processor().normalize(dec!(0), dec!(60), dec!(0)).is_ok());
        assert!(processor().normalize(dec!(200), dec!(130), dec!(1)).is_ok());
        assert!(processor().normalize(dec!(100), dec!(0.1), dec!(1)).is_ok());
    }

    #[rstest]
    #[case(dec!(-0.1), dec!(60), dec!(10), "proof")]
    #[case(dec!(200.01), dec!(60), dec!(10), "proof")]
    #[case(dec!(100), dec!(0), dec!(10), "temperature_f")]
    #[case(dec!(100), dec!(-5), dec!(10), "temperature_f")]
    #[case(dec!(100), dec!(130.5), dec!(10), "temperature_f")]
    #[case(dec!(100), dec!(60), dec!(-0.01), "volume_gallons")]
    fn test_out_of_bounds_rejected(
        #[case] proof: Decimal,
        #[case] temperature: Decimal,
        #[case] volume: Decimal,
        #[case] expected_field: &str,
    ) {
        let err = processor().normalize(proof, temperature, volume).unwrap_err();
        match err {
            GaugeError::InvalidMeasurement { field, .. } => assert_eq!(field, expected_field),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
