//! In-process [`ComplianceStore`].
//!
//! A unit of work holds the store's single lock for its whole life and writes
//! into a private copy of the state; commit swaps the copy in. Reads made
//! through the store itself wait for any open unit of work, so a caller must
//! not read through the store while it holds a unit of work.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use stillhouse_shared::types::{
    AuditEntryId, BarrelId, CompanyId, GaugeRecordId, LedgerTransactionId, ReportId,
    TaxDeterminationId,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::audit::{AuditCursor, AuditFilter, AuditLogEntry, NewAuditEntry};
use crate::company::CompanyProfile;
use crate::excise::TaxDetermination;
use crate::gauge::GaugeRecord;
use crate::ledger::{
    LedgerCursor, LedgerQuery, LedgerTransaction, NewLedgerTransaction, TransactionType,
};
use crate::period::{DateRange, ReportPeriod};
use crate::report::MonthlyReport;
use crate::store::{ComplianceStore, StoreError, UnitOfWork};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    profiles: HashMap<CompanyId, CompanyProfile>,
    gauges: Vec<GaugeRecord>,
    ledger: Vec<LedgerTransaction>,
    next_ledger_sequence: i64,
    determinations: Vec<TaxDetermination>,
    gauge_claims: HashMap<GaugeRecordId, TaxDeterminationId>,
    reports: Vec<MonthlyReport>,
    audit: Vec<AuditLogEntry>,
    next_audit_sequence: i64,
}

impl MemoryState {
    fn report_conflict(&self, report: &MonthlyReport) -> Result<(), StoreError> {
        let taken = report.occupies_period()
            && self.reports.iter().any(|r| {
                r.id != report.id
                    && r.company_id == report.company_id
                    && r.period == report.period
                    && r.occupies_period()
            });
        if taken {
            return Err(StoreError::Conflict(format!(
                "company {} already has a report for {}",
                report.company_id, report.period
            )));
        }
        Ok(())
    }

    fn reports_for_period(
        &self,
        company_id: CompanyId,
        period: ReportPeriod,
    ) -> Vec<MonthlyReport> {
        self.reports
            .iter()
            .filter(|r| r.company_id == company_id && r.period == period)
            .cloned()
            .collect()
    }

    fn report(&self, company_id: CompanyId, id: ReportId) -> Option<MonthlyReport> {
        self.reports
            .iter()
            .find(|r| r.company_id == company_id && r.id == id)
            .cloned()
    }

    fn tax_determination(
        &self,
        company_id: CompanyId,
        id: TaxDeterminationId,
    ) -> Option<TaxDetermination> {
        self.determinations
            .iter()
            .find(|d| d.company_id == company_id && d.id == id)
            .cloned()
    }
}

/// Compliance store kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryComplianceStore {
    state: Arc<Mutex<MemoryState>>,
    fail_audit_writes: Arc<AtomicBool>,
}

impl InMemoryComplianceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later audit write fail with `StoreError::AuditWriteFailure`.
    pub fn set_fail_audit_writes(&self, fail: bool) {
        self.fail_audit_writes.store(fail, Ordering::SeqCst);
    }
}

/// Unit of work over [`InMemoryComplianceStore`].
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_audit_writes: bool,
}

impl UnitOfWork for MemoryUnitOfWork {
    async fn company_profile(
        &mut self,
        company_id: CompanyId,
    ) -> Result<Option<CompanyProfile>, StoreError> {
        Ok(self.working.profiles.get(&company_id).cloned())
    }

    async fn save_company_profile(&mut self, profile: &CompanyProfile) -> Result<(), StoreError> {
        self.working
            .profiles
            .insert(profile.company_id, profile.clone());
        Ok(())
    }

    async fn insert_gauge_record(&mut self, record: &GaugeRecord) -> Result<(), StoreError> {
        if self.working.gauges.iter().any(|g| g.id == record.id) {
            return Err(StoreError::Conflict(format!(
                "gauge record {} already exists",
                record.id
            )));
        }
        self.working.gauges.push(record.clone());
        Ok(())
    }

    async fn insert_ledger_transaction(
        &mut self,
        id: LedgerTransactionId,
        transaction: NewLedgerTransaction,
    ) -> Result<LedgerTransaction, StoreError> {
        self.working.next_ledger_sequence += 1;
        let stored = LedgerTransaction::from_new(
            id,
            self.working.next_ledger_sequence,
            Utc::now(),
            transaction,
        );
        self.working.ledger.push(stored.clone());
        Ok(stored)
    }

    async fn insert_tax_determination(
        &mut self,
        determination: &TaxDetermination,
    ) -> Result<(), StoreError> {
        let duplicate = self.working.determinations.iter().any(|d| {
            d.company_id == determination.company_id
                && d.order_reference == determination.order_reference
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "order {} already has a tax determination",
                determination.order_reference
            )));
        }
        self.working.determinations.push(determination.clone());
        Ok(())
    }

    async fn claim_gauge(
        &mut self,
        _company_id: CompanyId,
        gauge_id: GaugeRecordId,
        determination_id: TaxDeterminationId,
    ) -> Result<(), StoreError> {
        if let Some(owner) = self.working.gauge_claims.get(&gauge_id) {
            return Err(StoreError::Conflict(format!(
                "gauge record {gauge_id} already taxed by determination {owner}"
            )));
        }
        self.working.gauge_claims.insert(gauge_id, determination_id);
        Ok(())
    }

    async fn tax_determination(
        &mut self,
        company_id: CompanyId,
        id: TaxDeterminationId,
    ) -> Result<Option<TaxDetermination>, StoreError> {
        Ok(self.working.tax_determination(company_id, id))
    }

    async fn update_tax_determination(
        &mut self,
        determination: &TaxDetermination,
    ) -> Result<(), StoreError> {
        let stored = self
            .working
            .determinations
            .iter_mut()
            .find(|d| d.id == determination.id)
            .ok_or_else(|| {
                StoreError::Corrupt(format!("tax determination {} missing", determination.id))
            })?;
        stored.payment_reference.clone_from(&determination.payment_reference);
        stored.payment_date = determination.payment_date;
        Ok(())
    }

    async fn lock_report_period(
        &mut self,
        _company_id: CompanyId,
        _period: ReportPeriod,
    ) -> Result<(), StoreError> {
        // The unit of work already holds the whole store.
        Ok(())
    }

    async fn reports_for_period(
        &mut self,
        company_id: CompanyId,
        period: ReportPeriod,
    ) -> Result<Vec<MonthlyReport>, StoreError> {
        Ok(self.working.reports_for_period(company_id, period))
    }

    async fn report(
        &mut self,
        company_id: CompanyId,
        id: ReportId,
    ) -> Result<Option<MonthlyReport>, StoreError> {
        Ok(self.working.report(company_id, id))
    }

    async fn insert_report(&mut self, report: &MonthlyReport) -> Result<(), StoreError> {
        self.working.report_conflict(report)?;
        self.working.reports.push(report.clone());
        Ok(())
    }

    async fn update_report(&mut self, report: &MonthlyReport) -> Result<(), StoreError> {
        self.working.report_conflict(report)?;
        let stored = self
            .working
            .reports
            .iter_mut()
            .find(|r| r.id == report.id)
            .ok_or_else(|| StoreError::Corrupt(format!("report {} missing", report.id)))?;
        *stored = report.clone();
        Ok(())
    }

    async fn append_audit(&mut self, entry: NewAuditEntry) -> Result<AuditLogEntry, StoreError> {
        if self.fail_audit_writes {
            return Err(StoreError::AuditWriteFailure(
                "audit log unavailable".to_string(),
            ));
        }

        let now = Utc::now();
        let recorded_at = match self.working.audit.last() {
            Some(last) if last.recorded_at >= now => last.recorded_at + Duration::microseconds(1),
            _ => now,
        };
        self.working.next_audit_sequence += 1;
        let written = AuditLogEntry {
            id: AuditEntryId::new(),
            sequence: self.working.next_audit_sequence,
            recorded_at,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            action: entry.action,
            actor: entry.actor,
            old_value: entry.old_value,
            new_value: entry.new_value,
            metadata: entry.metadata,
        };
        self.working.audit.push(written.clone());
        Ok(written)
    }

    async fn commit(self) -> Result<(), StoreError> {
        let Self {
            mut guard, working, ..
        } = self;
        *guard = working;
        Ok(())
    }
}

impl ComplianceStore for InMemoryComplianceStore {
    type Tx = MemoryUnitOfWork;

    async fn begin(&self) -> Result<MemoryUnitOfWork, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(MemoryUnitOfWork {
            guard,
            working,
            fail_audit_writes: self.fail_audit_writes.load(Ordering::SeqCst),
        })
    }

    async fn company_profile(
        &self,
        company_id: CompanyId,
    ) -> Result<Option<CompanyProfile>, StoreError> {
        Ok(self.state.lock().await.profiles.get(&company_id).cloned())
    }

    async fn scheduled_companies(&self) -> Result<Vec<CompanyProfile>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .profiles
            .values()
            .filter(|p| p.schedule.is_some())
            .cloned()
            .collect())
    }

    async fn gauge_record(
        &self,
        company_id: CompanyId,
        id: GaugeRecordId,
    ) -> Result<Option<GaugeRecord>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .gauges
            .iter()
            .find(|g| g.company_id == company_id && g.id == id)
            .cloned())
    }

    async fn gauges_for_barrel(
        &self,
        company_id: CompanyId,
        barrel_id: BarrelId,
    ) -> Result<Vec<GaugeRecord>, StoreError> {
        let mut gauges: Vec<GaugeRecord> = self
            .state
            .lock()
            .await
            .gauges
            .iter()
            .filter(|g| g.company_id == company_id && g.barrel_id == barrel_id)
            .cloned()
            .collect();
        // Stable sort keeps write order among equal timestamps.
        gauges.sort_by_key(|g| g.measured_at);
        Ok(gauges)
    }

    async fn ledger_transaction(
        &self,
        company_id: CompanyId,
        id: LedgerTransactionId,
    ) -> Result<Option<LedgerTransaction>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .ledger
            .iter()
            .find(|t| t.company_id == company_id && t.id == id)
            .cloned())
    }

    async fn ledger_page(
        &self,
        company_id: CompanyId,
        query: &LedgerQuery,
        after: Option<LedgerCursor>,
        limit: u64,
    ) -> Result<Vec<LedgerTransaction>, StoreError> {
        let mut page: Vec<LedgerTransaction> = self
            .state
            .lock()
            .await
            .ledger
            .iter()
            .filter(|t| {
                t.company_id == company_id
                    && query.matches(t)
                    && after.is_none_or(|cursor| t.cursor() > cursor)
            })
            .cloned()
            .collect();
        page.sort_by_key(LedgerTransaction::cursor);
        page.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(page)
    }

    async fn production_proof_gallons(
        &self,
        company_id: CompanyId,
        range: DateRange,
    ) -> Result<Decimal, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .ledger
            .iter()
            .filter(|t| {
                t.company_id == company_id
                    && t.transaction_type == TransactionType::Production
                    && range.contains(t.transaction_date)
            })
            .map(|t| t.proof_gallons)
            .sum())
    }

    async fn tax_determination(
        &self,
        company_id: CompanyId,
        id: TaxDeterminationId,
    ) -> Result<Option<TaxDetermination>, StoreError> {
        Ok(self.state.lock().await.tax_determination(company_id, id))
    }

    async fn tax_determinations(
        &self,
        company_id: CompanyId,
        range: DateRange,
    ) -> Result<Vec<TaxDetermination>, StoreError> {
        let mut found: Vec<TaxDetermination> = self
            .state
            .lock()
            .await
            .determinations
            .iter()
            .filter(|d| d.company_id == company_id && range.contains(d.determination_date))
            .cloned()
            .collect();
        found.sort_by_key(|d| (d.determination_date, d.created_at));
        Ok(found)
    }

    async fn report(
        &self,
        company_id: CompanyId,
        id: ReportId,
    ) -> Result<Option<MonthlyReport>, StoreError> {
        Ok(self.state.lock().await.report(company_id, id))
    }

    async fn reports_for_period(
        &self,
        company_id: CompanyId,
        period: ReportPeriod,
    ) -> Result<Vec<MonthlyReport>, StoreError> {
        Ok(self.state.lock().await.reports_for_period(company_id, period))
    }

    async fn audit_page(
        &self,
        filter: &AuditFilter,
        after: Option<AuditCursor>,
        limit: u64,
    ) -> Result<Vec<AuditLogEntry>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .audit
            .iter()
            .filter(|e| after.is_none_or(|cursor| e.cursor() > cursor) && filter.matches(e))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{SpiritsClass, TaxStatus};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn production(company_id: CompanyId, day: u32, proof: Decimal) -> NewLedgerTransaction {
        NewLedgerTransaction {
            company_id,
            transaction_date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            transaction_type: TransactionType::Production,
            product_type: "BOURBON".to_string(),
            spirits_class: SpiritsClass::WhiskyUnder160,
            tax_status: TaxStatus::Bonded,
            proof_gallons: proof,
            wine_gallons: proof,
            source: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_dropped_unit_of_work_discards_writes() {
        let store = InMemoryComplianceStore::new();
        let company = CompanyId::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_ledger_transaction(
                LedgerTransactionId::new(),
                production(company, 1, dec!(10)),
            )
                .await
                .unwrap();
        }
        let range = ReportPeriod::new(2026, 3).unwrap().date_range();
        assert_eq!(
            store.production_proof_gallons(company, range).await.unwrap(),
            Decimal::ZERO
        );
    }

    #[tokio::test]
    async fn test_ledger_page_orders_by_date_then_sequence() {
        let store = InMemoryComplianceStore::new();
        let company = CompanyId::new();
        let mut tx = store.begin().await.unwrap();
        for (day, proof) in [(5, dec!(1)), (2, dec!(2)), (5, dec!(3))] {
            tx.insert_ledger_transaction(
                LedgerTransactionId::new(),
                production(company, day, proof),
            )
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();

        let query = LedgerQuery::for_range(ReportPeriod::new(2026, 3).unwrap().date_range());
        let first = store.ledger_page(company, &query, None, 2).await.unwrap();
        let proofs: Vec<Decimal> = first.iter().map(|t| t.proof_gallons).collect();
        assert_eq!(proofs, vec![dec!(2), dec!(1)]);

        let rest = store
            .ledger_page(company, &query, Some(first[1].cursor()), 2)
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].proof_gallons, dec!(3));

        let other = store.ledger_page(CompanyId::new(), &query, None, 10).await.unwrap();
        assert!(other.is_empty());
    }
}
