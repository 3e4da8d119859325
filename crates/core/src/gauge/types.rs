//! Gauge domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use stillhouse_shared::types::{BarrelId, CompanyId, GaugeRecordId};

/// Why a barrel was gauged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GaugePurpose {
    /// Gauged when the barrel was filled.
    Fill,
    /// Periodic gauge while in storage.
    Storage,
    /// Gauged on removal; feeds tax determination.
    Removal,
}

impl GaugePurpose {
    /// Returns the string representation of the purpose.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fill => "fill",
            Self::Storage => "storage",
            Self::Removal => "removal",
        }
    }

    /// Parses a purpose from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fill" => Some(Self::Fill),
            "storage" => Some(Self::Storage),
            "removal" => Some(Self::Removal),
            _ => None,
        }
    }
}

impl fmt::Display for GaugePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw measurement taken at the barrel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaugeMeasurement {
    /// The barrel that was gauged.
    pub barrel_id: BarrelId,
    /// Why the barrel was gauged.
    pub purpose: GaugePurpose,
    /// When the measurement was taken.
    pub measured_at: DateTime<Utc>,
    /// Observed proof (0-200).
    pub proof: Decimal,
    /// Observed temperature in °F.
    pub temperature_f: Decimal,
    /// Observed volume in gallons.
    pub volume_gallons: Decimal,
    /// Operator who took the measurement.
    pub operator: Option<String>,
}

/// Quantities derived from a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedGauge {
    /// Wine gallons at 60°F, two decimals.
    pub wine_gallons: Decimal,
    /// Proof gallons derived from the rounded wine gallons, two decimals.
    pub proof_gallons: Decimal,
}

/// A persisted, immutable gauge record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaugeRecord {
    /// Unique identifier.
    pub id: GaugeRecordId,
    /// Owning company.
    pub company_id: CompanyId,
    /// The barrel that was gauged.
    pub barrel_id: BarrelId,
    /// Why the barrel was gauged.
    pub purpose: GaugePurpose,
    /// When the measurement was taken.
    pub measured_at: DateTime<Utc>,
    /// Observed proof.
    pub observed_proof: Decimal,
    /// Observed temperature in °F.
    pub observed_temperature_f: Decimal,
    /// Observed volume in gallons.
    pub observed_volume: Decimal,
    /// Wine gallons at 60°F.
    pub wine_gallons: Decimal,
    /// Proof gallons.
    pub proof_gallons: Decimal,
    /// Operator who took the measurement.
    pub operator: Option<String>,
    /// The record this one corrects.
    pub supersedes: Option<GaugeRecordId>,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
}

impl GaugeRecord {
    /// Builds a record from a validated measurement.
    #[must_use]
    pub fn new(
        company_id: CompanyId,
        measurement: GaugeMeasurement,
        normalized: NormalizedGauge,
        supersedes: Option<GaugeRecordId>,
    ) -> Self {
        Self {
            id: GaugeRecordId::new(),
            company_id,
            barrel_id: measurement.barrel_id,
            purpose: measurement.purpose,
            measured_at: measurement.measured_at,
            observed_proof: measurement.proof,
            observed_temperature_f: measurement.temperature_f,
            observed_volume: measurement.volume_gallons,
            wine_gallons: normalized.wine_gallons,
            proof_gallons: normalized.proof_gallons,
            operator: measurement.operator,
            supersedes,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purpose_round_trip() {
        for purpose in [GaugePurpose::Fill, GaugePurpose::Storage, GaugePurpose::Removal] {
            assert_eq!(GaugePurpose::parse(purpose.as_str()), Some(purpose));
        }
        assert_eq!(GaugePurpose::parse("REMOVAL"), None);
    }
}
