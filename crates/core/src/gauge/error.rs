//! Gauge error types.

use rust_decimal::Decimal;
use stillhouse_shared::types::{BarrelId, GaugeRecordId};
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur while recording gauges.
#[derive(Debug, Error)]
pub enum GaugeError {
    /// A measured value is outside its physical bounds.
    #[error("Invalid measurement: {field} = {value} ({reason})")]
    InvalidMeasurement {
        /// The offending field.
        field: &'static str,
        /// The observed value.
        value: Decimal,
        /// The violated bound.
        reason: &'static str,
    },

    /// Gauge record not found.
    #[error("Gauge record {0} not found")]
    NotFound(GaugeRecordId),

    /// A correction names a different barrel than the record it corrects.
    #[error("Correction for barrel {expected} was measured on barrel {actual}")]
    BarrelMismatch {
        /// Barrel of the original record.
        expected: BarrelId,
        /// Barrel of the correcting measurement.
        actual: BarrelId,
    },

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GaugeError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidMeasurement { .. } | Self::BarrelMismatch { .. } => 400,
            Self::NotFound(_) => 404,
            Self::Store(e) => e.status_code(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidMeasurement { .. } => "INVALID_MEASUREMENT",
            Self::NotFound(_) => "GAUGE_NOT_FOUND",
            Self::BarrelMismatch { .. } => "BARREL_MISMATCH",
            Self::Store(e) => e.error_code(),
        }
    }
}
