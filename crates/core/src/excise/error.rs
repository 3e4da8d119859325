//! Excise error types.

use rust_decimal::Decimal;
use stillhouse_shared::types::{CompanyId, GaugeRecordId, TaxDeterminationId};
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur during tax determination.
#[derive(Debug, Error)]
pub enum ExciseError {
    /// A gallon quantity is negative.
    #[error("Invalid quantity: {field} = {value} must not be negative")]
    InvalidQuantity {
        /// The offending field.
        field: &'static str,
        /// The rejected value.
        value: Decimal,
    },

    /// A configured rate is negative.
    #[error("Invalid rate: {field} = {value} must not be negative")]
    InvalidRate {
        /// The offending field.
        field: &'static str,
        /// The rejected value.
        value: Decimal,
    },

    /// Order reference is empty.
    #[error("Order reference is required")]
    OrderReferenceRequired,

    /// The order already has a determination.
    #[error("Tax already determined for order {0}")]
    DuplicateDetermination(String),

    /// A gauge used for tax determination was not taken on removal.
    #[error("Gauge record {0} is not a removal gauge")]
    NonRemovalGauge(GaugeRecordId),

    /// No gauges were supplied.
    #[error("At least one removal gauge is required")]
    NoGauges,

    /// A later correction replaced the gauge's figures.
    #[error("Gauge record {gauge_id} is superseded by {superseded_by}")]
    GaugeSuperseded {
        /// The stale gauge.
        gauge_id: GaugeRecordId,
        /// The correcting gauge.
        superseded_by: GaugeRecordId,
    },

    /// Another determination already taxed the gauge.
    #[error("Gauge record {0} is already part of a tax determination")]
    GaugeAlreadyDetermined(GaugeRecordId),

    /// Gauge record not found.
    #[error("Gauge record {0} not found")]
    GaugeNotFound(GaugeRecordId),

    /// The company has no compliance profile.
    #[error("Company {0} has no compliance profile")]
    CompanyNotFound(CompanyId),

    /// Tax determination not found.
    #[error("Tax determination {0} not found")]
    DeterminationNotFound(TaxDeterminationId),

    /// Payment was already recorded.
    #[error("Tax determination {0} is already paid")]
    AlreadyPaid(TaxDeterminationId),

    /// Payment reference is empty.
    #[error("Payment reference is required")]
    PaymentReferenceRequired,

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ExciseError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidQuantity { .. }
            | Self::InvalidRate { .. }
            | Self::OrderReferenceRequired
            | Self::NonRemovalGauge(_)
            | Self::NoGauges
            | Self::PaymentReferenceRequired => 400,
            Self::GaugeNotFound(_) | Self::CompanyNotFound(_) | Self::DeterminationNotFound(_) => {
                404
            }
            Self::DuplicateDetermination(_)
            | Self::GaugeSuperseded { .. }
            | Self::GaugeAlreadyDetermined(_)
            | Self::AlreadyPaid(_) => 409,
            Self::Store(e) => e.status_code(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidQuantity { .. } => "INVALID_QUANTITY",
            Self::InvalidRate { .. } => "INVALID_RATE",
            Self::OrderReferenceRequired => "ORDER_REFERENCE_REQUIRED",
            Self::DuplicateDetermination(_) => "DUPLICATE_DETERMINATION",
            Self::NonRemovalGauge(_) => "NON_REMOVAL_GAUGE",
            Self::NoGauges => "NO_GAUGES",
            Self::GaugeSuperseded { .. } => "GAUGE_SUPERSEDED",
            Self::GaugeAlreadyDetermined(_) => "GAUGE_ALREADY_DETERMINED",
            Self::GaugeNotFound(_) => "GAUGE_NOT_FOUND",
            Self::CompanyNotFound(_) => "COMPANY_NOT_FOUND",
            Self::DeterminationNotFound(_) => "TAX_DETERMINATION_NOT_FOUND",
            Self::AlreadyPaid(_) => "ALREADY_PAID",
            Self::PaymentReferenceRequired => "PAYMENT_REFERENCE_REQUIRED",
            Self::Store(e) => e.error_code(),
        }
    }
}
