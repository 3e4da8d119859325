//! Company profile error types.

use rust_decimal::Decimal;
use stillhouse_shared::types::CompanyId;
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur while managing company profiles.
#[derive(Debug, Error)]
pub enum CompanyError {
    /// Legal name is empty.
    #[error("Legal name is required")]
    LegalNameRequired,

    /// Threshold override is negative.
    #[error("Reduced-rate threshold must not be negative, got {0}")]
    InvalidThreshold(Decimal),

    /// Schedule fields are out of range.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Profile not found.
    #[error("Company {0} has no compliance profile")]
    NotFound(CompanyId),

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CompanyError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::LegalNameRequired | Self::InvalidThreshold(_) | Self::InvalidSchedule(_) => 400,
            Self::NotFound(_) => 404,
            Self::Store(e) => e.status_code(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::LegalNameRequired => "LEGAL_NAME_REQUIRED",
            Self::InvalidThreshold(_) => "INVALID_THRESHOLD",
            Self::InvalidSchedule(_) => "INVALID_SCHEDULE",
            Self::NotFound(_) => "COMPANY_NOT_FOUND",
            Self::Store(e) => e.error_code(),
        }
    }
}
