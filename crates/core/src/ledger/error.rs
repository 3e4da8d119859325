//! Ledger error types.

use rust_decimal::Decimal;
use stillhouse_shared::types::LedgerTransactionId;
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// A gallon quantity is negative.
    #[error("Invalid quantity: {field} = {value} must not be negative")]
    InvalidQuantity {
        /// The offending field.
        field: &'static str,
        /// The rejected value.
        value: Decimal,
    },

    /// Product type is empty.
    #[error("Product type is required")]
    BlankProductType,

    /// A string does not name a member of a closed set.
    #[error("Unknown {field}: {value}")]
    UnknownValue {
        /// Which closed set was parsed.
        field: &'static str,
        /// The rejected input.
        value: String,
    },

    // ========== Correction Errors ==========
    /// A correction moves no gallons.
    #[error("Correction must change at least one quantity")]
    EmptyCorrection,

    /// A correction mixes an increase with a decrease.
    #[error("Correction deltas must share a sign: proof {proof_delta}, wine {wine_delta}")]
    MixedCorrection {
        /// Proof-gallon delta.
        proof_delta: Decimal,
        /// Wine-gallon delta.
        wine_delta: Decimal,
    },

    /// Ledger transaction not found.
    #[error("Ledger transaction {0} not found")]
    TransactionNotFound(LedgerTransactionId),

    // ========== Persistence ==========
    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidQuantity { .. }
            | Self::BlankProductType
            | Self::UnknownValue { .. }
            | Self::EmptyCorrection
            | Self::MixedCorrection { .. } => 400,
            Self::TransactionNotFound(_) => 404,
            Self::Store(e) => e.status_code(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidQuantity { .. } => "INVALID_QUANTITY",
            Self::BlankProductType => "BLANK_PRODUCT_TYPE",
            Self::UnknownValue { .. } => "UNKNOWN_VALUE",
            Self::EmptyCorrection => "EMPTY_CORRECTION",
            Self::MixedCorrection { .. } => "MIXED_CORRECTION",
            Self::TransactionNotFound(_) => "LEDGER_TRANSACTION_NOT_FOUND",
            Self::Store(e) => e.error_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        let err = LedgerError::InvalidQuantity {
            field: "proof_gallons",
            value: dec!(-1),
        };
        assert_eq!(err.error_code(), "INVALID_QUANTITY");
        assert_eq!(err.status_code(), 400);
        assert_eq!(
            LedgerError::Store(StoreError::Database("down".into())).status_code(),
            500
        );
    }
}
