//! Persistence seam for the compliance engine.
//!
//! The db crate implements these traits on PostgreSQL; [`memory`] provides an
//! in-process implementation with the same transactional guarantees.
//!
//! Every mutation happens inside a [`UnitOfWork`]. Dropping a unit of work
//! without calling [`UnitOfWork::commit`] discards all of its writes, which is
//! how an audit-write failure rolls back the entity change it describes.

pub mod memory;

use std::future::Future;

use rust_decimal::Decimal;
use stillhouse_shared::types::{
    BarrelId, CompanyId, GaugeRecordId, LedgerTransactionId, ReportId, TaxDeterminationId,
};
use thiserror::Error;

use crate::audit::{AuditCursor, AuditFilter, AuditLogEntry, NewAuditEntry};
use crate::company::CompanyProfile;
use crate::excise::TaxDetermination;
use crate::gauge::GaugeRecord;
use crate::ledger::{LedgerCursor, LedgerQuery, LedgerTransaction, NewLedgerTransaction};
use crate::period::{DateRange, ReportPeriod};
use crate::report::MonthlyReport;

pub use memory::InMemoryComplianceStore;

/// Errors raised by store implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A uniqueness rule was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The audit entry could not be written; the enclosing mutation is aborted.
    #[error("Audit write failed: {0}")]
    AuditWriteFailure(String),

    /// A persisted row could not be mapped back to a domain value.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// The backing database failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Conflict(_) => "CONFLICT",
            Self::AuditWriteFailure(_) => "AUDIT_WRITE_FAILURE",
            Self::Corrupt(_) => "CORRUPT_RECORD",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Conflict(_) => 409,
            Self::AuditWriteFailure(_) | Self::Corrupt(_) | Self::Database(_) => 500,
        }
    }
}

/// A single atomic unit of work.
///
/// Reads issued through a unit of work observe its own uncommitted writes and
/// lock what they return until commit or drop.
pub trait UnitOfWork: Send {
    /// Loads a company profile for update.
    fn company_profile(
        &mut self,
        company_id: CompanyId,
    ) -> impl Future<Output = Result<Option<CompanyProfile>, StoreError>> + Send;

    /// Inserts or replaces a company profile.
    fn save_company_profile(
        &mut self,
        profile: &CompanyProfile,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Inserts a gauge record.
    fn insert_gauge_record(
        &mut self,
        record: &GaugeRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Appends a ledger transaction, assigning its insertion sequence.
    fn insert_ledger_transaction(
        &mut self,
        id: LedgerTransactionId,
        transaction: NewLedgerTransaction,
    ) -> impl Future<Output = Result<LedgerTransaction, StoreError>> + Send;

    /// Inserts a tax determination.
    ///
    /// Fails with `StoreError::Conflict` if the company already has a
    /// determination for the same order.
    fn insert_tax_determination(
        &mut self,
        determination: &TaxDetermination,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Records that `determination_id` taxed the removal measured by
    /// `gauge_id`.
    ///
    /// Fails with `StoreError::Conflict` if another determination already
    /// claimed the gauge.
    fn claim_gauge(
        &mut self,
        company_id: CompanyId,
        gauge_id: GaugeRecordId,
        determination_id: TaxDeterminationId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Loads a tax determination for update.
    fn tax_determination(
        &mut self,
        company_id: CompanyId,
        id: TaxDeterminationId,
    ) -> impl Future<Output = Result<Option<TaxDetermination>, StoreError>> + Send;

    /// Persists the payment fields of a tax determination.
    fn update_tax_determination(
        &mut self,
        determination: &TaxDetermination,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Serializes report creation for one company and period until commit.
    fn lock_report_period(
        &mut self,
        company_id: CompanyId,
        period: ReportPeriod,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Lists every report for a company and period.
    fn reports_for_period(
        &mut self,
        company_id: CompanyId,
        period: ReportPeriod,
    ) -> impl Future<Output = Result<Vec<MonthlyReport>, StoreError>> + Send;

    /// Loads a report for update.
    fn report(
        &mut self,
        company_id: CompanyId,
        id: ReportId,
    ) -> impl Future<Output = Result<Option<MonthlyReport>, StoreError>> + Send;

    /// Inserts a report.
    fn insert_report(
        &mut self,
        report: &MonthlyReport,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Replaces a report's mutable state.
    fn update_report(
        &mut self,
        report: &MonthlyReport,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Writes an audit entry.
    ///
    /// Any failure is reported as `StoreError::AuditWriteFailure`.
    fn append_audit(
        &mut self,
        entry: NewAuditEntry,
    ) -> impl Future<Output = Result<AuditLogEntry, StoreError>> + Send;

    /// Makes every write of this unit of work visible atomically.
    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Read access and unit-of-work factory for compliance data.
pub trait ComplianceStore: Send + Sync {
    /// The unit-of-work type produced by [`ComplianceStore::begin`].
    type Tx: UnitOfWork;

    /// Starts a unit of work.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, StoreError>> + Send;

    /// Finds a company's compliance profile.
    fn company_profile(
        &self,
        company_id: CompanyId,
    ) -> impl Future<Output = Result<Option<CompanyProfile>, StoreError>> + Send;

    /// Lists profiles that carry a report schedule.
    fn scheduled_companies(
        &self,
    ) -> impl Future<Output = Result<Vec<CompanyProfile>, StoreError>> + Send;

    /// Finds a gauge record.
    fn gauge_record(
        &self,
        company_id: CompanyId,
        id: GaugeRecordId,
    ) -> impl Future<Output = Result<Option<GaugeRecord>, StoreError>> + Send;

    /// Lists a barrel's gauges ordered by measurement time, then write order.
    fn gauges_for_barrel(
        &self,
        company_id: CompanyId,
        barrel_id: BarrelId,
    ) -> impl Future<Output = Result<Vec<GaugeRecord>, StoreError>> + Send;

    /// Finds a ledger transaction.
    fn ledger_transaction(
        &self,
        company_id: CompanyId,
        id: LedgerTransactionId,
    ) -> impl Future<Output = Result<Option<LedgerTransaction>, StoreError>> + Send;

    /// Returns up to `limit` matching transactions ordered by
    /// `(transaction_date, sequence)`, strictly after `after`.
    fn ledger_page(
        &self,
        company_id: CompanyId,
        query: &LedgerQuery,
        after: Option<LedgerCursor>,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<LedgerTransaction>, StoreError>> + Send;

    /// Sums production proof gallons dated inside `range`.
    fn production_proof_gallons(
        &self,
        company_id: CompanyId,
        range: DateRange,
    ) -> impl Future<Output = Result<Decimal, StoreError>> + Send;

    /// Finds a tax determination.
    fn tax_determination(
        &self,
        company_id: CompanyId,
        id: TaxDeterminationId,
    ) -> impl Future<Output = Result<Option<TaxDetermination>, StoreError>> + Send;

    /// Lists determinations dated inside `range`, oldest first.
    fn tax_determinations(
        &self,
        company_id: CompanyId,
        range: DateRange,
    ) -> impl Future<Output = Result<Vec<TaxDetermination>, StoreError>> + Send;

    /// Finds a report.
    fn report(
        &self,
        company_id: CompanyId,
        id: ReportId,
    ) -> impl Future<Output = Result<Option<MonthlyReport>, StoreError>> + Send;

    /// Lists every report for a company and period, oldest first.
    fn reports_for_period(
        &self,
        company_id: CompanyId,
        period: ReportPeriod,
    ) -> impl Future<Output = Result<Vec<MonthlyReport>, StoreError>> + Send;

    /// Returns up to `limit` matching audit entries in write order,
    /// strictly after `after`.
    fn audit_page(
        &self,
        filter: &AuditFilter,
        after: Option<AuditCursor>,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<AuditLogEntry>, StoreError>> + Send;
}
