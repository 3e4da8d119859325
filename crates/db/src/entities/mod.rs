//! `SeaORM` entity definitions.
//!
//! One module per table created by the migrations.

pub mod audit_log;
pub mod company_compliance_profiles;
pub mod gauge_records;
pub mod ledger_transactions;
pub mod monthly_reports;
pub mod tax_determination_gauges;
pub mod tax_determinations;
