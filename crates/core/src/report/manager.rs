//! Report generation and lifecycle operations.
//!
//! Every mutating operation loads the report inside a unit of work, resolves
//! its event through [`ReportStateMachine`], persists the new state together
//! with exactly one audit entry per report touched, commits, and only then
//! informs the registered [`TransitionListener`]s.
//!
//! Generation for one company and period is serialized twice: by an
//! in-process keyed lock, and by the store's period lock taken inside the
//! unit of work that inserts the Draft.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::{Stream, TryStreamExt};
use rust_decimal::Decimal;
use stillhouse_shared::types::{CompanyId, ReportId};
use tokio::sync::Mutex;

use crate::audit::{
    Actor, AuditAction, AuditContext, AuditEntityType, AuditFilter, AuditLogEntry, AuditLogger,
};
use crate::company::CompanyProfile;
use crate::excise::ExciseCalculator;
use crate::ledger::{LedgerQuery, LedgerService};
use crate::period::ReportPeriod;
use crate::reconciliation::{
    GroupKey, MonthlyReportData, OpeningSource, ReconciliationAggregator, ReconciliationLine,
};
use crate::report::error::ReportError;
use crate::report::listener::{TransitionListener, TransitionNotice};
use crate::report::state_machine::ReportStateMachine;
use crate::report::types::{MonthlyReport, ReportEvent, ReportStatus, ReviewDecision};
use crate::report::validation::{ReportValidator, ValidationReport, ValidationWarning};
use crate::store::{ComplianceStore, UnitOfWork};

/// Drives monthly reports from generation to archival.
pub struct ReportLifecycleManager<S> {
    store: Arc<S>,
    validator: ReportValidator,
    page_size: u64,
    period_locks: DashMap<(CompanyId, ReportPeriod), Arc<Mutex<()>>>,
    listeners: Vec<Arc<dyn TransitionListener>>,
}

impl<S: ComplianceStore> ReportLifecycleManager<S> {
    /// Creates a manager reading the ledger in pages of `page_size`.
    pub fn new(store: Arc<S>, validator: ReportValidator, page_size: u64) -> Self {
        Self {
            store,
            validator,
            page_size: page_size.max(1),
            period_locks: DashMap::new(),
            listeners: Vec::new(),
        }
    }

    /// Registers a listener for committed transitions.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn TransitionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Aggregates and validates a period and persists it as a new Draft.
    ///
    /// Rejected reports for the period are superseded by the new Draft and
    /// archived in the same unit of work.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if a report other than a rejected one occupies the
    /// period.
    pub async fn generate(
        &self,
        company_id: CompanyId,
        year: i32,
        month: u32,
        ctx: &AuditContext,
    ) -> Result<MonthlyReport, ReportError> {
        let period = ReportPeriod::new(year, month)?;
        let lock = self.period_lock(company_id, period);
        let _guard = lock.lock().await;

        let profile = self.profile(company_id).await?;
        let existing = self.store.reports_for_period(company_id, period).await?;
        if existing.iter().any(MonthlyReport::occupies_period) {
            return Err(ReportError::AlreadyExists { company_id, period });
        }

        let compiled = self.compile(company_id, period).await?;
        let validation = compiled.validate(&self.validator, &profile);
        let report = MonthlyReport::draft(
            profile.report_form,
            compiled.data,
            validation,
            ctx.actor.clone(),
        );

        let mut tx = self.store.begin().await?;
        tx.lock_report_period(company_id, period).await?;
        let existing = tx.reports_for_period(company_id, period).await?;
        if existing.iter().any(MonthlyReport::occupies_period) {
            return Err(ReportError::AlreadyExists { company_id, period });
        }

        tx.insert_report(&report).await?;
        AuditLogger::record(
            &mut tx,
            AuditEntityType::MonthlyReport,
            report.id.into(),
            AuditAction::Create,
            ctx,
            None,
            Some(&report),
        )
        .await?;

        let mut superseded = Vec::new();
        for old in existing
            .into_iter()
            .filter(|r| r.status == ReportStatus::Rejected)
        {
            let mut replaced = old.clone();
            replaced.apply(ReportEvent::Supersede, &ctx.actor, report.generated_at, None)?;
            replaced.superseded_by = Some(report.id);
            tx.update_report(&replaced).await?;
            AuditLogger::record(
                &mut tx,
                AuditEntityType::MonthlyReport,
                replaced.id.into(),
                AuditAction::Update,
                ctx,
                Some(&old),
                Some(&replaced),
            )
            .await?;
            superseded.push(replaced);
        }
        tx.commit().await?;

        tracing::info!(
            report_id = %report.id,
            %company_id,
            %period,
            errors = report.validation.errors.len(),
            warnings = report.validation.warnings.len(),
            superseded = superseded.len(),
            "Report generated"
        );
        if !report.validation.is_valid() {
            tracing::warn!(
                report_id = %report.id,
                errors = report.validation.errors.len(),
                "Generated report has validation errors"
            );
        }

        self.notify(&report, None);
        for replaced in &superseded {
            self.notify(replaced, Some(ReportStatus::Rejected));
        }
        Ok(report)
    }

    /// Re-validates a Draft against the current company profile and the
    /// current ledger.
    ///
    /// Errors move the report to ValidationFailed; otherwise it stays Draft
    /// with a refreshed validation snapshot. Ledger entries posted since the
    /// report was generated show up as `ReconciliationImbalance` errors, and
    /// `retry` folds them in.
    pub async fn validate(
        &self,
        company_id: CompanyId,
        report_id: ReportId,
        ctx: &AuditContext,
    ) -> Result<MonthlyReport, ReportError> {
        let current = self.get(company_id, report_id).await?;
        if current.status != ReportStatus::Draft {
            return Err(ReportError::InvalidTransition {
                from: current.status,
                event: ReportEvent::FailValidation,
            });
        }
        let lock = self.period_lock(company_id, current.period);
        let _guard = lock.lock().await;

        let profile = self.profile(company_id).await?;
        let compiled = self.compile(company_id, current.period).await?;
        let validator = self.validator;
        self.mutate(company_id, report_id, false, ctx, move |report, actor, at| {
            if report.status != ReportStatus::Draft {
                return Err(ReportError::InvalidTransition {
                    from: report.status,
                    event: ReportEvent::FailValidation,
                });
            }
            report.validation = compiled.revalidate(&report.data, &validator, &profile);
            report.updated_at = at;
            if !report.validation.is_valid() {
                tracing::warn!(
                    report_id = %report.id,
                    errors = report.validation.errors.len(),
                    "Report failed validation"
                );
                report.apply(ReportEvent::FailValidation, actor, at, None)?;
            }
            Ok(())
        })
        .await
    }

    /// Re-aggregates a ValidationFailed report and returns it to Draft.
    pub async fn retry(
        &self,
        company_id: CompanyId,
        report_id: ReportId,
        ctx: &AuditContext,
    ) -> Result<MonthlyReport, ReportError> {
        self.rework(company_id, report_id, ReportEvent::Retry, false, ctx)
            .await
    }

    /// Re-aggregates a Rejected report and returns it to Draft.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if another report has claimed the period since the
    /// rejection.
    pub async fn reopen(
        &self,
        company_id: CompanyId,
        report_id: ReportId,
        ctx: &AuditContext,
    ) -> Result<MonthlyReport, ReportError> {
        self.rework(company_id, report_id, ReportEvent::Reopen, true, ctx)
            .await
    }

    /// Hands a Draft to review.
    ///
    /// # Errors
    ///
    /// `ValidationBlocked` if validation still reports errors, including a
    /// snapshot that has fallen behind the ledger; the report is left
    /// untouched.
    pub async fn submit_for_review(
        &self,
        company_id: CompanyId,
        report_id: ReportId,
        ctx: &AuditContext,
    ) -> Result<MonthlyReport, ReportError> {
        let current = self.get(company_id, report_id).await?;
        ReportStateMachine::next(current.status, ReportEvent::SubmitForReview)?;
        let lock = self.period_lock(company_id, current.period);
        let _guard = lock.lock().await;

        let profile = self.profile(company_id).await?;
        let compiled = self.compile(company_id, current.period).await?;
        let validator = self.validator;
        self.mutate(company_id, report_id, false, ctx, move |report, actor, at| {
            ReportStateMachine::next(report.status, ReportEvent::SubmitForReview)?;
            let validation = compiled.revalidate(&report.data, &validator, &profile);
            if !validation.is_valid() {
                tracing::warn!(
                    report_id = %report.id,
                    errors = validation.errors.len(),
                    "Submission for review blocked by validation errors"
                );
                return Err(ReportError::ValidationBlocked {
                    errors: validation.errors.len(),
                });
            }
            report.validation = validation;
            report.apply(ReportEvent::SubmitForReview, actor, at, None)?;
            report.submitted_for_review_by = Some(actor.clone());
            report.submitted_for_review_at = Some(at);
            Ok(())
        })
        .await
    }

    /// Records a reviewer's decision.
    pub async fn review(
        &self,
        company_id: CompanyId,
        report_id: ReportId,
        decision: ReviewDecision,
        ctx: &AuditContext,
    ) -> Result<MonthlyReport, ReportError> {
        let (event, notes) = match decision {
            ReviewDecision::Approve { notes } => (
                ReportEvent::Approve,
                notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            ),
            ReviewDecision::Reject { notes } => {
                let notes = notes.trim().to_string();
                if notes.is_empty() {
                    return Err(ReportError::RejectionNotesRequired);
                }
                (ReportEvent::Reject, Some(notes))
            }
        };

        self.mutate(company_id, report_id, false, ctx, move |report, actor, at| {
            if event == ReportEvent::Approve
                && report.submitted_for_review_by.as_ref() == Some(actor)
            {
                return Err(ReportError::SelfReview);
            }
            report.apply(event, actor, at, notes.clone())?;
            report.reviewed_by = Some(actor.clone());
            report.reviewed_at = Some(at);
            report.review_notes = notes;
            Ok(())
        })
        .await
    }

    /// Records filing with the regulator.
    pub async fn mark_submitted(
        &self,
        company_id: CompanyId,
        report_id: ReportId,
        confirmation_number: &str,
        ctx: &AuditContext,
    ) -> Result<MonthlyReport, ReportError> {
        let confirmation_number = confirmation_number.trim().to_string();
        if confirmation_number.is_empty() {
            return Err(ReportError::ConfirmationNumberRequired);
        }

        self.mutate(company_id, report_id, false, ctx, move |report, actor, at| {
            report.apply(ReportEvent::MarkSubmitted, actor, at, None)?;
            report.submitted_at = Some(at);
            report.confirmation_number = Some(confirmation_number);
            Ok(())
        })
        .await
    }

    /// Closes a filed report.
    pub async fn archive(
        &self,
        company_id: CompanyId,
        report_id: ReportId,
        ctx: &AuditContext,
    ) -> Result<MonthlyReport, ReportError> {
        self.mutate(company_id, report_id, false, ctx, |report, actor, at| {
            report.apply(ReportEvent::Archive, actor, at, None)?;
            Ok(())
        })
        .await
    }

    /// Records the rendered document for an approved or filed report.
    pub async fn attach_document(
        &self,
        company_id: CompanyId,
        report_id: ReportId,
        document_reference: &str,
        ctx: &AuditContext,
    ) -> Result<MonthlyReport, ReportError> {
        let document_reference = document_reference.trim().to_string();
        if document_reference.is_empty() {
            return Err(ReportError::DocumentReferenceRequired);
        }

        self.mutate(company_id, report_id, false, ctx, move |report, _, at| {
            if !matches!(
                report.status,
                ReportStatus::Approved | ReportStatus::Submitted
            ) {
                return Err(ReportError::DocumentNotAttachable {
                    status: report.status,
                });
            }
            report.document_reference = Some(document_reference);
            report.updated_at = at;
            Ok(())
        })
        .await
    }

    /// Finds a report.
    pub async fn get(
        &self,
        company_id: CompanyId,
        report_id: ReportId,
    ) -> Result<MonthlyReport, ReportError> {
        self.store
            .report(company_id, report_id)
            .await?
            .ok_or(ReportError::NotFound(report_id))
    }

    /// Lists every report for a period, oldest first.
    pub async fn reports_for_period(
        &self,
        company_id: CompanyId,
        year: i32,
        month: u32,
    ) -> Result<Vec<MonthlyReport>, ReportError> {
        let period = ReportPeriod::new(year, month)?;
        Ok(self.store.reports_for_period(company_id, period).await?)
    }

    /// Streams a report's audit entries in write order.
    pub fn audit_trail(
        &self,
        report_id: ReportId,
    ) -> impl Stream<Item = Result<AuditLogEntry, ReportError>> + Send + '_ {
        AuditLogger::stream(
            self.store.as_ref(),
            AuditFilter::for_entity(AuditEntityType::MonthlyReport, report_id.into()),
            None,
            self.page_size,
        )
        .map_err(ReportError::from)
    }

    async fn rework(
        &self,
        company_id: CompanyId,
        report_id: ReportId,
        event: ReportEvent,
        claim_period: bool,
        ctx: &AuditContext,
    ) -> Result<MonthlyReport, ReportError> {
        let current = self.get(company_id, report_id).await?;
        ReportStateMachine::next(current.status, event)?;

        let lock = self.period_lock(company_id, current.period);
        let _guard = lock.lock().await;

        let profile = self.profile(company_id).await?;
        let compiled = self.compile(company_id, current.period).await?;
        let validation = compiled.validate(&self.validator, &profile);
        let data = compiled.data;

        self.mutate(
            company_id,
            report_id,
            claim_period,
            ctx,
            move |report, actor, at| {
                report.apply(event, actor, at, None)?;
                report.data = data;
                report.validation = validation;
                Ok(())
            },
        )
        .await
    }

    /// Loads, changes and persists one report with its audit entry.
    ///
    /// With `claim_period` the period lock is taken and the call fails if
    /// another report occupies the period.
    async fn mutate<F>(
        &self,
        company_id: CompanyId,
        report_id: ReportId,
        claim_period: bool,
        ctx: &AuditContext,
        change: F,
    ) -> Result<MonthlyReport, ReportError>
    where
        F: FnOnce(&mut MonthlyReport, &Actor, DateTime<Utc>) -> Result<(), ReportError> + Send,
    {
        let mut tx = self.store.begin().await?;
        let old = tx
            .report(company_id, report_id)
            .await?
            .ok_or(ReportError::NotFound(report_id))?;

        if claim_period {
            tx.lock_report_period(company_id, old.period).await?;
            let taken = tx
                .reports_for_period(company_id, old.period)
                .await?
                .iter()
                .any(|r| r.id != report_id && r.occupies_period());
            if taken {
                return Err(ReportError::AlreadyExists {
                    company_id,
                    period: old.period,
                });
            }
        }

        let mut report = old.clone();
        change(&mut report, &ctx.actor, Utc::now())?;

        tx.update_report(&report).await?;
        AuditLogger::record(
            &mut tx,
            AuditEntityType::MonthlyReport,
            report.id.into(),
            AuditAction::Update,
            ctx,
            Some(&old),
            Some(&report),
        )
        .await?;
        tx.commit().await?;

        if report.status == old.status {
            tracing::info!(report_id = %report.id, status = %report.status, "Report updated");
        } else {
            tracing::info!(
                report_id = %report.id,
                company_id = %report.company_id,
                period = %report.period,
                from = %old.status,
                to = %report.status,
                actor = %ctx.actor,
                "Report transitioned"
            );
            self.notify(&report, Some(old.status));
        }
        Ok(report)
    }

    /// Builds the period's report data from the predecessor report, the
    /// period's ledger window and its tax determinations.
    ///
    /// The predecessor is the newest report of the previous period that still
    /// occupies it, whatever its status. A Draft or ValidationFailed
    /// predecessor therefore feeds the openings, with a
    /// `PriorPeriodUnapproved` warning. A period holding only Rejected or
    /// superseded reports has no predecessor and the openings are zero, with
    /// a `MissingPriorPeriod` warning. The predecessor's period is folded
    /// again from its own openings so that ledger entries posted after it was
    /// generated surface as `PriorPeriodChanged`.
    async fn compile(
        &self,
        company_id: CompanyId,
        period: ReportPeriod,
    ) -> Result<Compiled, ReportError> {
        let prior = self
            .store
            .reports_for_period(company_id, period.previous())
            .await?
            .into_iter()
            .rev()
            .find(MonthlyReport::occupies_period);
        let (openings, opening_source, prior_warnings) = match &prior {
            Some(prior) => {
                let own_openings = prior.data.lines.iter().map(|l| (l.key(), l.opening)).collect();
                let refolded = self.fold(company_id, prior.period, own_openings).await?;
                (
                    ReconciliationAggregator::openings_from(&prior.data),
                    OpeningSource::PriorReport {
                        report_id: prior.id,
                        period: prior.period,
                    },
                    self.validator.check_prior(prior, &refolded),
                )
            }
            None => (BTreeMap::new(), OpeningSource::None, Vec::new()),
        };

        let lines = self.fold(company_id, period, openings).await?;

        let determinations = self
            .store
            .tax_determinations(company_id, period.date_range())
            .await?;
        let ledger_gallons: Decimal = lines.iter().map(|l| l.removals.tax_determined).sum();
        let tax_summary = ExciseCalculator::summarize(&determinations, ledger_gallons);

        Ok(Compiled {
            data: MonthlyReportData {
                company_id,
                period,
                lines,
                opening_source,
                tax_summary,
            },
            prior_warnings,
        })
    }

    async fn fold(
        &self,
        company_id: CompanyId,
        period: ReportPeriod,
        openings: BTreeMap<GroupKey, Decimal>,
    ) -> Result<Vec<ReconciliationLine>, ReportError> {
        let transactions = LedgerService::stream(
            self.store.as_ref(),
            company_id,
            LedgerQuery::for_range(period.date_range()),
            None,
            self.page_size,
        );
        Ok(ReconciliationAggregator::aggregate_stream(openings, transactions).await?)
    }

    async fn profile(&self, company_id: CompanyId) -> Result<CompanyProfile, ReportError> {
        self.store
            .company_profile(company_id)
            .await?
            .ok_or(ReportError::CompanyNotFound(company_id))
    }

    fn period_lock(&self, company_id: CompanyId, period: ReportPeriod) -> Arc<Mutex<()>> {
        Arc::clone(
            self.period_locks
                .entry((company_id, period))
                .or_default()
                .value(),
        )
    }

    fn notify(&self, report: &MonthlyReport, from: Option<ReportStatus>) {
        if self.listeners.is_empty() {
            return;
        }
        let (actor, at) = match report.history.last() {
            Some(last) if from.is_some() => (last.actor.clone(), last.at),
            _ => (report.generated_by.clone(), report.generated_at),
        };
        let notice = TransitionNotice {
            report_id: report.id,
            company_id: report.company_id,
            period: report.period,
            from,
            to: report.status,
            actor,
            at,
        };
        for listener in &self.listeners {
            listener.on_transition(&notice);
        }
    }
}

/// Freshly folded report data and the findings about its predecessor.
struct Compiled {
    data: MonthlyReportData,
    prior_warnings: Vec<ValidationWarning>,
}

impl Compiled {
    fn validate(&self, validator: &ReportValidator, profile: &CompanyProfile) -> ValidationReport {
        let mut validation = validator.validate(&self.data, profile);
        validation.warnings.extend(self.prior_warnings.iter().cloned());
        validation
    }

    /// Validates a stored snapshot of the same period against this fold.
    fn revalidate(
        &self,
        snapshot: &MonthlyReportData,
        validator: &ReportValidator,
        profile: &CompanyProfile,
    ) -> ValidationReport {
        let mut validation = validator.validate_against_ledger(snapshot, &self.data, profile);
        validation.warnings.extend(self.prior_warnings.iter().cloned());
        validation
    }
}
