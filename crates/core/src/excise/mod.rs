//! Federal excise tax determination.
//!
//! - `types` - Excise domain types (TaxRates, ExciseInput, TaxBreakdown, TaxDetermination)
//! - `error` - Excise-specific error types
//! - `calculator` - Two-tier rate split (pure)
//! - `service` - Persisted determinations and payments

pub mod calculator;
pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod calculator_props;

pub use calculator::ExciseCalculator;
pub use error::ExciseError;
pub use service::TaxService;
pub use types::{ExciseInput, TaxBreakdown, TaxDetermination, TaxOrder, TaxRates, TaxSummary};
