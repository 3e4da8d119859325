//! PostgreSQL implementation of the compliance store.
//!
//! Each [`PgUnitOfWork`] wraps one database transaction. Reads issued through
//! it take row locks, and [`UnitOfWork::lock_report_period`] takes a
//! transaction-scoped advisory lock so concurrent report generation for the
//! same company and period is serialized.
//!
//! Inserts into `ledger_transactions` and `audit_log` first take that table's
//! append lock, held until the transaction ends. An identity `sequence` is
//! drawn at insert time, so without the lock a transaction could commit a
//! higher sequence before a lower one became visible, and a reader resuming
//! after the higher one would never see the lower. With it, sequences become
//! visible in the order they were drawn. Locks are always taken in the order
//! report period, ledger, audit.

mod convert;

use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, EntityTrait, FromQueryResult,
    QueryFilter, QueryOrder, QuerySelect, Set, Statement, TransactionTrait,
};
use stillhouse_core::audit::{AuditCursor, AuditFilter, AuditLogEntry, NewAuditEntry};
use stillhouse_core::company::CompanyProfile;
use stillhouse_core::excise::TaxDetermination;
use stillhouse_core::gauge::GaugeRecord;
use stillhouse_core::ledger::{LedgerCursor, LedgerQuery, LedgerTransaction, NewLedgerTransaction};
use stillhouse_core::period::{DateRange, ReportPeriod};
use stillhouse_core::report::MonthlyReport;
use stillhouse_core::store::{ComplianceStore, StoreError, UnitOfWork};
use stillhouse_shared::types::{
    BarrelId, CompanyId, GaugeRecordId, LedgerTransactionId, ReportId, TaxDeterminationId,
};

use crate::entities::{
    audit_log, company_compliance_profiles, gauge_records, ledger_transactions, monthly_reports,
    tax_determinations,
};
use convert::{
    audit_err, audit_from_model, audit_to_active, db_err, gauge_claim_to_active, gauge_from_model,
    gauge_to_active, ledger_from_model, ledger_to_active, period_columns, profile_from_model,
    profile_to_active, report_from_model, report_to_active, tax_from_model, tax_to_active,
};

/// Compliance store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgComplianceStore {
    db: DatabaseConnection,
}

impl PgComplianceStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// One PostgreSQL transaction.
///
/// Dropping it without [`UnitOfWork::commit`] rolls the transaction back.
pub struct PgUnitOfWork {
    txn: DatabaseTransaction,
}

#[derive(Debug, FromQueryResult)]
struct ProductionTotal {
    total: Option<Decimal>,
}

fn period_filter(company_id: CompanyId, period: ReportPeriod) -> Condition {
    let (year, month) = period_columns(period);
    Condition::all()
        .add(monthly_reports::Column::CompanyId.eq(company_id.into_inner()))
        .add(monthly_reports::Column::PeriodYear.eq(year))
        .add(monthly_reports::Column::PeriodMonth.eq(month))
}

const ADVISORY_LOCK_SQL: &str = "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))";
const LEDGER_APPEND_KEY: &str = "append:ledger_transactions";
const AUDIT_APPEND_KEY: &str = "append:audit_log";

fn report_key(company_id: CompanyId, period: ReportPeriod) -> String {
    format!(
        "monthly_report:{company_id}:{:04}-{:02}",
        period.year(),
        period.month()
    )
}

fn ledger_filter(
    company_id: CompanyId,
    query: &LedgerQuery,
    after: Option<LedgerCursor>,
) -> Condition {
    use ledger_transactions::Column;

    let mut condition = Condition::all()
        .add(Column::CompanyId.eq(company_id.into_inner()))
        .add(Column::TransactionDate.gte(query.range.start()))
        .add(Column::TransactionDate.lt(query.range.end()));

    if !query.transaction_types.is_empty() {
        condition = condition.add(
            Column::TransactionType.is_in(query.transaction_types.iter().map(|t| t.as_str())),
        );
    }
    if !query.spirits_classes.is_empty() {
        condition = condition
            .add(Column::SpiritsClass.is_in(query.spirits_classes.iter().map(|c| c.as_str())));
    }
    if !query.tax_statuses.is_empty() {
        condition =
            condition.add(Column::TaxStatus.is_in(query.tax_statuses.iter().map(|s| s.as_str())));
    }
    if let Some(product_type) = &query.product_type {
        condition = condition.add(Column::ProductType.eq(product_type.as_str()));
    }
    if let Some(cursor) = after {
        condition = condition.add(
            Condition::any()
                .add(Column::TransactionDate.gt(cursor.transaction_date))
                .add(
                    Condition::all()
                        .add(Column::TransactionDate.eq(cursor.transaction_date))
                        .add(Column::Sequence.gt(cursor.sequence)),
                ),
        );
    }
    condition
}

fn audit_condition(filter: &AuditFilter, after: Option<AuditCursor>) -> Condition {
    use audit_log::Column;

    let mut condition = Condition::all();
    if let Some(entity_type) = filter.entity_type {
        condition = condition.add(Column::EntityType.eq(entity_type.as_str()));
    }
    if let Some(entity_id) = filter.entity_id {
        condition = condition.add(Column::EntityId.eq(entity_id));
    }
    if let Some(actor) = &filter.actor {
        condition = condition.add(Column::Actor.eq(actor.to_string()));
    }
    if let Some(from) = filter.from {
        condition = condition.add(Column::RecordedAt.gte(from.fixed_offset()));
    }
    if let Some(to) = filter.to {
        condition = condition.add(Column::RecordedAt.lt(to.fixed_offset()));
    }
    if let Some(cursor) = after {
        condition = condition.add(Column::Sequence.gt(cursor.sequence));
    }
    condition
}

impl PgUnitOfWork {
    /// Takes a transaction-scoped advisory lock on `key`.
    async fn advisory_lock(&self, key: String) -> Result<(), DbErr> {
        self.txn
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                ADVISORY_LOCK_SQL,
                [key.into()],
            ))
            .await?;
        Ok(())
    }
}

impl UnitOfWork for PgUnitOfWork {
    async fn company_profile(
        &mut self,
        company_id: CompanyId,
    ) -> Result<Option<CompanyProfile>, StoreError> {
        company_compliance_profiles::Entity::find_by_id(company_id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(profile_from_model)
            .transpose()
    }

    async fn save_company_profile(&mut self, profile: &CompanyProfile) -> Result<(), StoreError> {
        use company_compliance_profiles::Column;

        company_compliance_profiles::Entity::insert(profile_to_active(profile)?)
            .on_conflict(
                OnConflict::column(Column::CompanyId)
                    .update_columns([
                        Column::LegalName,
                        Column::PermitNumber,
                        Column::EmployerId,
                        Column::ReducedRateEligible,
                        Column::ReducedRateThreshold,
                        Column::ReportForm,
                        Column::Schedule,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn insert_gauge_record(&mut self, record: &GaugeRecord) -> Result<(), StoreError> {
        gauge_to_active(record)
            .insert(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn insert_ledger_transaction(
        &mut self,
        id: LedgerTransactionId,
        transaction: NewLedgerTransaction,
    ) -> Result<LedgerTransaction, StoreError> {
        self.advisory_lock(LEDGER_APPEND_KEY.to_string())
            .await
            .map_err(db_err)?;
        let model = ledger_to_active(id, &transaction)
            .insert(&self.txn)
            .await
            .map_err(db_err)?;
        ledger_from_model(model)
    }

    async fn insert_tax_determination(
        &mut self,
        determination: &TaxDetermination,
    ) -> Result<(), StoreError> {
        tax_to_active(determination)?
            .insert(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn tax_determination(
        &mut self,
        company_id: CompanyId,
        id: TaxDeterminationId,
    ) -> Result<Option<TaxDetermination>, StoreError> {
        tax_determinations::Entity::find_by_id(id.into_inner())
            .filter(tax_determinations::Column::CompanyId.eq(company_id.into_inner()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(tax_from_model)
            .transpose()
    }

    async fn claim_gauge(
        &mut self,
        company_id: CompanyId,
        gauge_id: GaugeRecordId,
        determination_id: TaxDeterminationId,
    ) -> Result<(), StoreError> {
        gauge_claim_to_active(company_id, gauge_id, determination_id)
            .insert(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_tax_determination(
        &mut self,
        determination: &TaxDetermination,
    ) -> Result<(), StoreError> {
        let active = tax_determinations::ActiveModel {
            id: Unchanged(determination.id.into_inner()),
            payment_reference: Set(determination.payment_reference.clone()),
            payment_date: Set(determination.payment_date),
            ..Default::default()
        };
        active.update(&self.txn).await.map_err(db_err)?;
        Ok(())
    }

    async fn lock_report_period(
        &mut self,
        company_id: CompanyId,
        period: ReportPeriod,
    ) -> Result<(), StoreError> {
        self.advisory_lock(report_key(company_id, period))
            .await
            .map_err(db_err)?;
        tracing::debug!(%company_id, %period, "Report period locked");
        Ok(())
    }

    async fn reports_for_period(
        &mut self,
        company_id: CompanyId,
        period: ReportPeriod,
    ) -> Result<Vec<MonthlyReport>, StoreError> {
        monthly_reports::Entity::find()
            .filter(period_filter(company_id, period))
            .order_by_asc(monthly_reports::Column::GeneratedAt)
            .order_by_asc(monthly_reports::Column::Id)
            .lock_exclusive()
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(report_from_model)
            .collect()
    }

    async fn report(
        &mut self,
        company_id: CompanyId,
        id: ReportId,
    ) -> Result<Option<MonthlyReport>, StoreError> {
        monthly_reports::Entity::find_by_id(id.into_inner())
            .filter(monthly_reports::Column::CompanyId.eq(company_id.into_inner()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(report_from_model)
            .transpose()
    }

    async fn insert_report(&mut self, report: &MonthlyReport) -> Result<(), StoreError> {
        report_to_active(report)?
            .insert(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_report(&mut self, report: &MonthlyReport) -> Result<(), StoreError> {
        let mut active = report_to_active(report)?;
        active.id = Unchanged(report.id.into_inner());
        active.update(&self.txn).await.map_err(db_err)?;
        Ok(())
    }

    async fn append_audit(&mut self, entry: NewAuditEntry) -> Result<AuditLogEntry, StoreError> {
        let active = audit_to_active(&entry)?;
        self.advisory_lock(AUDIT_APPEND_KEY.to_string())
            .await
            .map_err(audit_err)?;
        let model = active
            .insert(&self.txn)
            .await
            .map_err(|e| {
                tracing::error!(
                    entity_type = %entry.entity_type,
                    entity_id = %entry.entity_id,
                    error = %e,
                    "Audit write failed"
                );
                audit_err(e)
            })?;
        audit_from_model(model)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().await.map_err(db_err)
    }
}

impl ComplianceStore for PgComplianceStore {
    type Tx = PgUnitOfWork;

    async fn begin(&self) -> Result<PgUnitOfWork, StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        Ok(PgUnitOfWork { txn })
    }

    async fn company_profile(
        &self,
        company_id: CompanyId,
    ) -> Result<Option<CompanyProfile>, StoreError> {
        company_compliance_profiles::Entity::find_by_id(company_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(profile_from_model)
            .transpose()
    }

    async fn scheduled_companies(&self) -> Result<Vec<CompanyProfile>, StoreError> {
        company_compliance_profiles::Entity::find()
            .filter(company_compliance_profiles::Column::Schedule.is_not_null())
            .order_by_asc(company_compliance_profiles::Column::CompanyId)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(profile_from_model)
            .collect()
    }

    async fn gauge_record(
        &self,
        company_id: CompanyId,
        id: GaugeRecordId,
    ) -> Result<Option<GaugeRecord>, StoreError> {
        gauge_records::Entity::find_by_id(id.into_inner())
            .filter(gauge_records::Column::CompanyId.eq(company_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(gauge_from_model)
            .transpose()
    }

    async fn gauges_for_barrel(
        &self,
        company_id: CompanyId,
        barrel_id: BarrelId,
    ) -> Result<Vec<GaugeRecord>, StoreError> {
        gauge_records::Entity::find()
            .filter(gauge_records::Column::CompanyId.eq(company_id.into_inner()))
            .filter(gauge_records::Column::BarrelId.eq(barrel_id.into_inner()))
            .order_by_asc(gauge_records::Column::MeasuredAt)
            .order_by_asc(gauge_records::Column::CreatedAt)
            .order_by_asc(gauge_records::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(gauge_from_model)
            .collect()
    }

    async fn ledger_transaction(
        &self,
        company_id: CompanyId,
        id: LedgerTransactionId,
    ) -> Result<Option<LedgerTransaction>, StoreError> {
        ledger_transactions::Entity::find_by_id(id.into_inner())
            .filter(ledger_transactions::Column::CompanyId.eq(company_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(ledger_from_model)
            .transpose()
    }

    async fn ledger_page(
        &self,
        company_id: CompanyId,
        query: &LedgerQuery,
        after: Option<LedgerCursor>,
        limit: u64,
    ) -> Result<Vec<LedgerTransaction>, StoreError> {
        ledger_transactions::Entity::find()
            .filter(ledger_filter(company_id, query, after))
            .order_by_asc(ledger_transactions::Column::TransactionDate)
            .order_by_asc(ledger_transactions::Column::Sequence)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(ledger_from_model)
            .collect()
    }

    async fn production_proof_gallons(
        &self,
        company_id: CompanyId,
        range: DateRange,
    ) -> Result<Decimal, StoreError> {
        use ledger_transactions::Column;

        let row = ledger_transactions::Entity::find()
            .select_only()
            .column_as(Expr::col(Column::ProofGallons).sum(), "total")
            .filter(Column::CompanyId.eq(company_id.into_inner()))
            .filter(Column::TransactionType.eq("production"))
            .filter(Column::TransactionDate.gte(range.start()))
            .filter(Column::TransactionDate.lt(range.end()))
            .into_model::<ProductionTotal>()
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(row.and_then(|r| r.total).unwrap_or(Decimal::ZERO))
    }

    async fn tax_determination(
        &self,
        company_id: CompanyId,
        id: TaxDeterminationId,
    ) -> Result<Option<TaxDetermination>, StoreError> {
        tax_determinations::Entity::find_by_id(id.into_inner())
            .filter(tax_determinations::Column::CompanyId.eq(company_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(tax_from_model)
            .transpose()
    }

    async fn tax_determinations(
        &self,
        company_id: CompanyId,
        range: DateRange,
    ) -> Result<Vec<TaxDetermination>, StoreError> {
        use tax_determinations::Column;

        tax_determinations::Entity::find()
            .filter(Column::CompanyId.eq(company_id.into_inner()))
            .filter(Column::DeterminationDate.gte(range.start()))
            .filter(Column::DeterminationDate.lt(range.end()))
            .order_by_asc(Column::DeterminationDate)
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(tax_from_model)
            .collect()
    }

    async fn report(
        &self,
        company_id: CompanyId,
        id: ReportId,
    ) -> Result<Option<MonthlyReport>, StoreError> {
        monthly_reports::Entity::find_by_id(id.into_inner())
            .filter(monthly_reports::Column::CompanyId.eq(company_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(report_from_model)
            .transpose()
    }

    async fn reports_for_period(
        &self,
        company_id: CompanyId,
        period: ReportPeriod,
    ) -> Result<Vec<MonthlyReport>, StoreError> {
        monthly_reports::Entity::find()
            .filter(period_filter(company_id, period))
            .order_by_asc(monthly_reports::Column::GeneratedAt)
            .order_by_asc(monthly_reports::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(report_from_model)
            .collect()
    }

    async fn audit_page(
        &self,
        filter: &AuditFilter,
        after: Option<AuditCursor>,
        limit: u64,
    ) -> Result<Vec<AuditLogEntry>, StoreError> {
        audit_log::Entity::find()
            .filter(audit_condition(filter, after))
            .order_by_asc(audit_log::Column::Sequence)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(audit_from_model)
            .collect()
    }
}
