//! Mapping between table rows and domain values.
//!
//! Row-to-domain conversions fail with `StoreError::Corrupt` when a column
//! holds a value the domain does not accept.

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{DbErr, Set, SqlErr};
use serde::Serialize;
use serde::de::DeserializeOwned;
use stillhouse_core::audit::{
    Actor, AuditAction, AuditEntityType, AuditLogEntry, NewAuditEntry, RequestMetadata,
};
use stillhouse_core::company::{CompanyProfile, FormType, ReportSchedule};
use stillhouse_core::excise::{TaxBreakdown, TaxDetermination, TaxRates};
use stillhouse_core::gauge::{GaugePurpose, GaugeRecord};
use stillhouse_core::ledger::{LedgerTransaction, NewLedgerTransaction, SourceRef};
use stillhouse_core::period::ReportPeriod;
use stillhouse_core::report::{MonthlyReport, ReportStatus};
use stillhouse_core::store::StoreError;
use stillhouse_shared::types::{
    AuditEntryId, BarrelId, CompanyId, GaugeRecordId, LedgerTransactionId, ReportId,
    TaxDeterminationId,
};
use uuid::Uuid;

use crate::entities::{
    audit_log, company_compliance_profiles, gauge_records, ledger_transactions, monthly_reports,
    tax_determination_gauges, tax_determinations,
};

/// Maps a database error, surfacing unique violations as conflicts.
pub(crate) fn db_err(err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => StoreError::Conflict(detail),
        _ => StoreError::Database(err.to_string()),
    }
}

/// Maps any failure while writing an audit entry.
pub(crate) fn audit_err(err: DbErr) -> StoreError {
    StoreError::AuditWriteFailure(err.to_string())
}

fn corrupt(what: &str, value: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{what}: {value}"))
}

fn utc(value: DateTime<FixedOffset>) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

fn fixed(value: DateTime<Utc>) -> DateTime<FixedOffset> {
    value.fixed_offset()
}

fn to_json<T: Serialize>(what: &str, value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|e| corrupt(what, e))
}

fn from_json<T: DeserializeOwned>(what: &str, value: serde_json::Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| corrupt(what, e))
}

fn actor(value: &str) -> Result<Actor, StoreError> {
    value.parse().map_err(StoreError::Corrupt)
}

fn optional_actor(value: Option<String>) -> Result<Option<Actor>, StoreError> {
    value.as_deref().map(actor).transpose()
}

// ============================================================
// Company profiles
// ============================================================

pub(crate) fn profile_from_model(
    model: company_compliance_profiles::Model,
) -> Result<CompanyProfile, StoreError> {
    let report_form = FormType::parse(&model.report_form)
        .ok_or_else(|| corrupt("report_form", &model.report_form))?;
    let schedule = model
        .schedule
        .map(|s| from_json::<ReportSchedule>("schedule", s))
        .transpose()?;

    Ok(CompanyProfile {
        company_id: CompanyId::from_uuid(model.company_id),
        legal_name: model.legal_name,
        permit_number: model.permit_number,
        employer_id: model.employer_id,
        reduced_rate_eligible: model.reduced_rate_eligible,
        reduced_rate_threshold: model.reduced_rate_threshold,
        report_form,
        schedule,
        updated_at: utc(model.updated_at),
    })
}

pub(crate) fn profile_to_active(
    profile: &CompanyProfile,
) -> Result<company_compliance_profiles::ActiveModel, StoreError> {
    Ok(company_compliance_profiles::ActiveModel {
        company_id: Set(profile.company_id.into_inner()),
        legal_name: Set(profile.legal_name.clone()),
        permit_number: Set(profile.permit_number.clone()),
        employer_id: Set(profile.employer_id.clone()),
        reduced_rate_eligible: Set(profile.reduced_rate_eligible),
        reduced_rate_threshold: Set(profile.reduced_rate_threshold),
        report_form: Set(profile.report_form.as_str().to_string()),
        schedule: Set(profile
            .schedule
            .as_ref()
            .map(|s| to_json("schedule", s))
            .transpose()?),
        updated_at: Set(fixed(profile.updated_at)),
    })
}

// ============================================================
// Gauge records
// ============================================================

pub(crate) fn gauge_from_model(model: gauge_records::Model) -> Result<GaugeRecord, StoreError> {
    let purpose =
        GaugePurpose::parse(&model.purpose).ok_or_else(|| corrupt("purpose", &model.purpose))?;

    Ok(GaugeRecord {
        id: GaugeRecordId::from_uuid(model.id),
        company_id: CompanyId::from_uuid(model.company_id),
        barrel_id: BarrelId::from_uuid(model.barrel_id),
        purpose,
        measured_at: utc(model.measured_at),
        observed_proof: model.observed_proof,
        observed_temperature_f: model.observed_temperature_f,
        observed_volume: model.observed_volume,
        wine_gallons: model.wine_gallons,
        proof_gallons: model.proof_gallons,
        operator: model.operator,
        supersedes: model.supersedes.map(GaugeRecordId::from_uuid),
        created_at: utc(model.created_at),
    })
}

pub(crate) fn gauge_to_active(record: &GaugeRecord) -> gauge_records::ActiveModel {
    gauge_records::ActiveModel {
        id: Set(record.id.into_inner()),
        company_id: Set(record.company_id.into_inner()),
        barrel_id: Set(record.barrel_id.into_inner()),
        purpose: Set(record.purpose.as_str().to_string()),
        measured_at: Set(fixed(record.measured_at)),
        observed_proof: Set(record.observed_proof),
        observed_temperature_f: Set(record.observed_temperature_f),
        observed_volume: Set(record.observed_volume),
        wine_gallons: Set(record.wine_gallons),
        proof_gallons: Set(record.proof_gallons),
        operator: Set(record.operator.clone()),
        supersedes: Set(record.supersedes.map(GaugeRecordId::into_inner)),
        created_at: Set(fixed(record.created_at)),
    }
}

// ============================================================
// Ledger transactions
// ============================================================

pub(crate) fn ledger_from_model(
    model: ledger_transactions::Model,
) -> Result<LedgerTransaction, StoreError> {
    let transaction_type = model
        .transaction_type
        .parse()
        .map_err(|e| corrupt("transaction_type", e))?;
    let spirits_class = model
        .spirits_class
        .parse()
        .map_err(|e| corrupt("spirits_class", e))?;
    let tax_status = model
        .tax_status
        .parse()
        .map_err(|e| corrupt("tax_status", e))?;
    let source = match (model.source_kind, model.source_reference) {
        (Some(kind), Some(reference)) => Some(
            SourceRef::from_parts(&kind, &reference).map_err(|e| corrupt("source", e))?,
        ),
        (None, None) => None,
        _ => return Err(corrupt("source", "kind and reference must both be set")),
    };

    Ok(LedgerTransaction {
        id: LedgerTransactionId::from_uuid(model.id),
        sequence: model.sequence,
        recorded_at: utc(model.recorded_at),
        company_id: CompanyId::from_uuid(model.company_id),
        transaction_date: model.transaction_date,
        transaction_type,
        product_type: model.product_type,
        spirits_class,
        tax_status,
        proof_gallons: model.proof_gallons,
        wine_gallons: model.wine_gallons,
        source,
        notes: model.notes,
    })
}

/// Sequence and timestamp are left to the database defaults.
pub(crate) fn ledger_to_active(
    id: LedgerTransactionId,
    transaction: &NewLedgerTransaction,
) -> ledger_transactions::ActiveModel {
    ledger_transactions::ActiveModel {
        id: Set(id.into_inner()),
        company_id: Set(transaction.company_id.into_inner()),
        transaction_date: Set(transaction.transaction_date),
        transaction_type: Set(transaction.transaction_type.as_str().to_string()),
        product_type: Set(transaction.product_type.clone()),
        spirits_class: Set(transaction.spirits_class.as_str().to_string()),
        tax_status: Set(transaction.tax_status.as_str().to_string()),
        proof_gallons: Set(transaction.proof_gallons),
        wine_gallons: Set(transaction.wine_gallons),
        source_kind: Set(transaction.source.as_ref().map(|s| s.kind().to_string())),
        source_reference: Set(transaction.source.as_ref().map(SourceRef::reference)),
        notes: Set(transaction.notes.clone()),
        ..Default::default()
    }
}

// ============================================================
// Tax determinations
// ============================================================

pub(crate) fn tax_from_model(
    model: tax_determinations::Model,
) -> Result<TaxDetermination, StoreError> {
    Ok(TaxDetermination {
        id: TaxDeterminationId::from_uuid(model.id),
        company_id: CompanyId::from_uuid(model.company_id),
        order_reference: model.order_reference,
        determination_date: model.determination_date,
        prior_ytd_production_gallons: model.prior_ytd_production_gallons,
        reduced_rate_eligible: model.reduced_rate_eligible,
        reduced_rate_threshold: model.reduced_rate_threshold,
        rates: TaxRates {
            reduced_rate: model.reduced_rate,
            standard_rate: model.standard_rate,
        },
        breakdown: TaxBreakdown {
            total_proof_gallons: model.total_proof_gallons,
            reduced_rate_gallons: model.reduced_rate_gallons,
            standard_rate_gallons: model.standard_rate_gallons,
            reduced_rate_tax: model.reduced_rate_tax,
            standard_rate_tax: model.standard_rate_tax,
            total_tax_due: model.total_tax_due,
            effective_tax_rate: model.effective_tax_rate,
        },
        gauge_ids: from_json("gauge_ids", model.gauge_ids)?,
        payment_reference: model.payment_reference,
        payment_date: model.payment_date,
        created_at: utc(model.created_at),
    })
}

pub(crate) fn tax_to_active(
    determination: &TaxDetermination,
) -> Result<tax_determinations::ActiveModel, StoreError> {
    let breakdown = &determination.breakdown;
    Ok(tax_determinations::ActiveModel {
        id: Set(determination.id.into_inner()),
        company_id: Set(determination.company_id.into_inner()),
        order_reference: Set(determination.order_reference.clone()),
        determination_date: Set(determination.determination_date),
        prior_ytd_production_gallons: Set(determination.prior_ytd_production_gallons),
        reduced_rate_eligible: Set(determination.reduced_rate_eligible),
        reduced_rate_threshold: Set(determination.reduced_rate_threshold),
        reduced_rate: Set(determination.rates.reduced_rate),
        standard_rate: Set(determination.rates.standard_rate),
        total_proof_gallons: Set(breakdown.total_proof_gallons),
        reduced_rate_gallons: Set(breakdown.reduced_rate_gallons),
        standard_rate_gallons: Set(breakdown.standard_rate_gallons),
        reduced_rate_tax: Set(breakdown.reduced_rate_tax),
        standard_rate_tax: Set(breakdown.standard_rate_tax),
        total_tax_due: Set(breakdown.total_tax_due),
        effective_tax_rate: Set(breakdown.effective_tax_rate),
        gauge_ids: Set(to_json("gauge_ids", &determination.gauge_ids)?),
        payment_reference: Set(determination.payment_reference.clone()),
        payment_date: Set(determination.payment_date),
        created_at: Set(fixed(determination.created_at)),
    })
}

pub(crate) fn gauge_claim_to_active(
    company_id: CompanyId,
    gauge_id: GaugeRecordId,
    determination_id: TaxDeterminationId,
) -> tax_determination_gauges::ActiveModel {
    tax_determination_gauges::ActiveModel {
        gauge_id: Set(gauge_id.into_inner()),
        determination_id: Set(determination_id.into_inner()),
        company_id: Set(company_id.into_inner()),
        ..Default::default()
    }
}

// ============================================================
// Monthly reports
// ============================================================

pub(crate) fn period_columns(period: ReportPeriod) -> (i32, i32) {
    // Months are 1-12 so the cast cannot truncate.
    #[allow(clippy::cast_possible_wrap)]
    let month = period.month() as i32;
    (period.year(), month)
}

pub(crate) fn report_from_model(
    model: monthly_reports::Model,
) -> Result<MonthlyReport, StoreError> {
    let month = u32::try_from(model.period_month).map_err(|e| corrupt("period_month", e))?;
    let period =
        ReportPeriod::new(model.period_year, month).map_err(|e| corrupt("period", e))?;
    let form_type =
        FormType::parse(&model.form_type).ok_or_else(|| corrupt("form_type", &model.form_type))?;
    let status =
        ReportStatus::parse(&model.status).ok_or_else(|| corrupt("status", &model.status))?;

    Ok(MonthlyReport {
        id: ReportId::from_uuid(model.id),
        company_id: CompanyId::from_uuid(model.company_id),
        period,
        form_type,
        status,
        data: from_json("data", model.data)?,
        validation: from_json("validation", model.validation)?,
        history: from_json("history", model.history)?,
        generated_by: actor(&model.generated_by)?,
        generated_at: utc(model.generated_at),
        submitted_for_review_by: optional_actor(model.submitted_for_review_by)?,
        submitted_for_review_at: model.submitted_for_review_at.map(utc),
        reviewed_by: optional_actor(model.reviewed_by)?,
        reviewed_at: model.reviewed_at.map(utc),
        review_notes: model.review_notes,
        submitted_at: model.submitted_at.map(utc),
        confirmation_number: model.confirmation_number,
        document_reference: model.document_reference,
        superseded_by: model.superseded_by.map(ReportId::from_uuid),
        updated_at: utc(model.updated_at),
    })
}

pub(crate) fn report_to_active(
    report: &MonthlyReport,
) -> Result<monthly_reports::ActiveModel, StoreError> {
    let (period_year, period_month) = period_columns(report.period);
    Ok(monthly_reports::ActiveModel {
        id: Set(report.id.into_inner()),
        company_id: Set(report.company_id.into_inner()),
        period_year: Set(period_year),
        period_month: Set(period_month),
        form_type: Set(report.form_type.as_str().to_string()),
        status: Set(report.status.as_str().to_string()),
        data: Set(to_json("data", &report.data)?),
        validation: Set(to_json("validation", &report.validation)?),
        history: Set(to_json("history", &report.history)?),
        generated_by: Set(report.generated_by.to_string()),
        generated_at: Set(fixed(report.generated_at)),
        submitted_for_review_by: Set(report.submitted_for_review_by.as_ref().map(Actor::to_string)),
        submitted_for_review_at: Set(report.submitted_for_review_at.map(fixed)),
        reviewed_by: Set(report.reviewed_by.as_ref().map(Actor::to_string)),
        reviewed_at: Set(report.reviewed_at.map(fixed)),
        review_notes: Set(report.review_notes.clone()),
        submitted_at: Set(report.submitted_at.map(fixed)),
        confirmation_number: Set(report.confirmation_number.clone()),
        document_reference: Set(report.document_reference.clone()),
        superseded_by: Set(report.superseded_by.map(ReportId::into_inner)),
        updated_at: Set(fixed(report.updated_at)),
    })
}

// ============================================================
// Audit log
// ============================================================

pub(crate) fn audit_from_model(model: audit_log::Model) -> Result<AuditLogEntry, StoreError> {
    let entity_type = AuditEntityType::parse(&model.entity_type)
        .ok_or_else(|| corrupt("entity_type", &model.entity_type))?;
    let action =
        AuditAction::parse(&model.action).ok_or_else(|| corrupt("action", &model.action))?;
    let metadata = model
        .metadata
        .map(|m| from_json::<RequestMetadata>("metadata", m))
        .transpose()?;

    Ok(AuditLogEntry {
        id: AuditEntryId::from_uuid(model.id),
        sequence: model.sequence,
        recorded_at: utc(model.recorded_at),
        entity_type,
        entity_id: model.entity_id,
        action,
        actor: actor(&model.actor)?,
        old_value: model.old_value,
        new_value: model.new_value,
        metadata,
    })
}

/// Sequence and timestamp are left to the database defaults.
pub(crate) fn audit_to_active(entry: &NewAuditEntry) -> Result<audit_log::ActiveModel, StoreError> {
    Ok(audit_log::ActiveModel {
        id: Set(Uuid::now_v7()),
        entity_type: Set(entry.entity_type.as_str().to_string()),
        entity_id: Set(entry.entity_id),
        action: Set(entry.action.as_str().to_string()),
        actor: Set(entry.actor.to_string()),
        old_value: Set(entry.old_value.clone()),
        new_value: Set(entry.new_value.clone()),
        metadata: Set(entry
            .metadata
            .as_ref()
            .map(|m| to_json("metadata", m))
            .transpose()
            .map_err(|e| StoreError::AuditWriteFailure(e.to_string()))?),
        ..Default::default()
    })
}
