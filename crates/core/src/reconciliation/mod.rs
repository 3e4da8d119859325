//! Monthly inventory reconciliation.
//!
//! - `types` - Reconciliation lines, removal breakdown and report data
//! - `aggregator` - Folds a month of ledger entries into balanced lines

pub mod aggregator;
pub mod types;

#[cfg(test)]
mod aggregator_props;

pub use aggregator::ReconciliationAggregator;
pub use types::{GroupKey, MonthlyReportData, OpeningSource, ReconciliationLine, RemovalBreakdown};
