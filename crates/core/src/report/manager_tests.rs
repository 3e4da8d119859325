//! Lifecycle tests against the in-memory store.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use futures::TryStreamExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stillhouse_shared::types::{CompanyId, UserId};

use crate::audit::{
    AuditAction, AuditContext, AuditEntityType, AuditFilter, AuditLogEntry, AuditLogger,
};
use crate::company::{CompanyProfile, FormType};
use crate::ledger::{
    LedgerService, NewLedgerTransaction, SpiritsClass, TaxStatus, TransactionType,
};
use crate::reconciliation::OpeningSource;
use crate::report::error::ReportError;
use crate::report::listener::{TransitionListener, TransitionNotice};
use crate::report::manager::ReportLifecycleManager;
use crate::report::types::{ReportEvent, ReportStatus, ReviewDecision};
use crate::report::validation::{ReportValidator, ValidationError, ValidationWarning};
use crate::store::{ComplianceStore, InMemoryComplianceStore, StoreError, UnitOfWork};

type Manager = ReportLifecycleManager<InMemoryComplianceStore>;

fn manager(store: &Arc<InMemoryComplianceStore>) -> Manager {
    ReportLifecycleManager::new(Arc::clone(store), ReportValidator::new(dec!(0.01), dec!(10)), 2)
}

async fn company(store: &Arc<InMemoryComplianceStore>, with_identifiers: bool) -> CompanyId {
    let company_id = CompanyId::new();
    let mut profile = CompanyProfile::new(company_id, "Copper Creek", FormType::MonthlyStorage);
    if with_identifiers {
        profile.permit_number = Some("DSP-KY-1".to_string());
        profile.employer_id = Some("12-3456789".to_string());
    }
    let mut tx = store.begin().await.unwrap();
    tx.save_company_profile(&profile).await.unwrap();
    tx.commit().await.unwrap();
    company_id
}

async fn post(
    store: &Arc<InMemoryComplianceStore>,
    company_id: CompanyId,
    date: NaiveDate,
    transaction_type: TransactionType,
    proof: Decimal,
) {
    LedgerService::new(Arc::clone(store), 100)
        .record(
            NewLedgerTransaction {
                company_id,
                transaction_date: date,
                transaction_type,
                product_type: "BOURBON".to_string(),
                spirits_class: SpiritsClass::WhiskyUnder160,
                tax_status: TaxStatus::Bonded,
                proof_gallons: proof,
                wine_gallons: proof,
                source: None,
                notes: None,
            },
            &AuditContext::system("test"),
        )
        .await
        .unwrap();
}

fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, month, day).unwrap()
}

async fn report_audit(store: &InMemoryComplianceStore) -> Vec<AuditLogEntry> {
    AuditLogger::stream(
        store,
        AuditFilter {
            entity_type: Some(AuditEntityType::MonthlyReport),
            ..AuditFilter::default()
        },
        None,
        10,
    )
    .try_collect()
    .await
    .unwrap()
}

#[derive(Default)]
struct Recorder(Mutex<Vec<TransitionNotice>>);

impl TransitionListener for Recorder {
    fn on_transition(&self, notice: &TransitionNotice) {
        self.0.lock().unwrap().push(notice.clone());
    }
}

#[tokio::test]
async fn test_happy_path_records_actors_and_timestamps() {
    let store = Arc::new(InMemoryComplianceStore::new());
    let company_id = company(&store, true).await;
    post(&store, company_id, day(3, 2), TransactionType::Production, dec!(100)).await;
    let manager = manager(&store);

    let scheduler = AuditContext::system("scheduler");
    let preparer = AuditContext::user(UserId::new());
    let reviewer = AuditContext::user(UserId::new());

    let report = manager.generate(company_id, 2026, 3, &scheduler).await.unwrap();
    assert_eq!(report.status, ReportStatus::Draft);
    assert!(report.validation.is_valid());
    assert_eq!(report.data.lines.len(), 1);
    assert_eq!(report.data.lines[0].closing, dec!(100));

    let report = manager
        .submit_for_review(company_id, report.id, &preparer)
        .await
        .unwrap();
    assert_eq!(report.status, ReportStatus::PendingReview);
    assert_eq!(report.submitted_for_review_by, Some(preparer.actor.clone()));
    assert!(report.submitted_for_review_at.is_some());

    let report = manager
        .review(
            company_id,
            report.id,
            ReviewDecision::Approve {
                notes: Some(" looks right ".to_string()),
            },
            &reviewer,
        )
        .await
        .unwrap();
    assert_eq!(report.status, ReportStatus::Approved);
    assert_eq!(report.reviewed_by, Some(reviewer.actor.clone()));
    assert_eq!(report.review_notes.as_deref(), Some("looks right"));

    let report = manager
        .mark_submitted(company_id, report.id, " TTB-2026-0042 ", &preparer)
        .await
        .unwrap();
    assert_eq!(report.status, ReportStatus::Submitted);
    assert_eq!(report.confirmation_number.as_deref(), Some("TTB-2026-0042"));
    assert!(report.submitted_at.is_some());

    let report = manager.archive(company_id, report.id, &preparer).await.unwrap();
    assert_eq!(report.status, ReportStatus::Archived);

    let events: Vec<ReportEvent> = report.history.iter().map(|t| t.event).collect();
    assert_eq!(
        events,
        vec![
            ReportEvent::SubmitForReview,
            ReportEvent::Approve,
            ReportEvent::MarkSubmitted,
            ReportEvent::Archive,
        ]
    );
    assert_eq!(report.history[1].actor, reviewer.actor);
    assert!(report.history.windows(2).all(|w| w[0].at <= w[1].at));
    assert_eq!(manager.get(company_id, report.id).await.unwrap(), report);
}

#[tokio::test]
async fn test_draft_cannot_skip_to_submitted() {
    let store = Arc::new(InMemoryComplianceStore::new());
    let company_id = company(&store, true).await;
    let manager = manager(&store);
    let ctx = AuditContext::system("test");

    let report = manager.generate(company_id, 2026, 3, &ctx).await.unwrap();
    let err = manager
        .mark_submitted(company_id, report.id, "TTB-1", &ctx)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReportError::InvalidTransition {
            from: ReportStatus::Draft,
            event: ReportEvent::MarkSubmitted
        }
    ));
    assert_eq!(manager.get(company_id, report.id).await.unwrap(), report);
    assert_eq!(report_audit(&store).await.len(), 1);
}

#[tokio::test]
async fn test_imbalance_blocks_submission_and_report_stays_draft() {
    let store = Arc::new(InMemoryComplianceStore::new());
    let company_id = company(&store, true).await;
    post(&store, company_id, day(3, 2), TransactionType::Production, dec!(100)).await;
    let manager = manager(&store);
    let ctx = AuditContext::system("test");

    let report = manager.generate(company_id, 2026, 3, &ctx).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let mut tampered = tx.report(company_id, report.id).await.unwrap().unwrap();
    tampered.data.lines[0].closing += dec!(5);
    tx.update_report(&tampered).await.unwrap();
    tx.commit().await.unwrap();

    let err = manager
        .submit_for_review(company_id, report.id, &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::ValidationBlocked { errors: 1 }));
    assert_eq!(manager.get(company_id, report.id).await.unwrap(), tampered);

    let failed = manager.validate(company_id, report.id, &ctx).await.unwrap();
    assert_eq!(failed.status, ReportStatus::ValidationFailed);
    assert!(matches!(
        failed.validation.errors[0],
        ValidationError::ReconciliationImbalance { difference, .. } if difference == dec!(5)
    ));

    let retried = manager.retry(company_id, report.id, &ctx).await.unwrap();
    assert_eq!(retried.status, ReportStatus::Draft);
    assert!(retried.validation.is_valid());
    assert_eq!(retried.data.lines[0].closing, dec!(100));

    let submitted = manager
        .submit_for_review(company_id, report.id, &ctx)
        .await
        .unwrap();
    assert_eq!(submitted.status, ReportStatus::PendingReview);
}

#[tokio::test]
async fn test_missing_identifiers_block_submission() {
    let store = Arc::new(InMemoryComplianceStore::new());
    let company_id = company(&store, false).await;
    let manager = manager(&store);
    let ctx = AuditContext::system("test");

    let report = manager.generate(company_id, 2026, 3, &ctx).await.unwrap();
    assert_eq!(report.status, ReportStatus::Draft);
    assert!(report.validation.errors.contains(&ValidationError::MissingIdentifier {
        field: "employer_id".to_string()
    }));

    let err = manager
        .submit_for_review(company_id, report.id, &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_BLOCKED");
    assert_eq!(
        manager.get(company_id, report.id).await.unwrap().status,
        ReportStatus::Draft
    );
}

#[tokio::test]
async fn test_one_audit_entry_per_mutation_with_consistent_snapshots() {
    let store = Arc::new(InMemoryComplianceStore::new());
    let company_id = company(&store, true).await;
    let manager = manager(&store);
    let ctx = AuditContext::system("test");
    let reviewer = AuditContext::user(UserId::new());

    let report = manager.generate(company_id, 2026, 3, &ctx).await.unwrap();
    manager.submit_for_review(company_id, report.id, &ctx).await.unwrap();
    manager
        .review(company_id, report.id, ReviewDecision::Approve { notes: None }, &reviewer)
        .await
        .unwrap();
    manager
        .attach_document(company_id, report.id, "s3://reports/2026-03.pdf", &ctx)
        .await
        .unwrap();

    let trail: Vec<AuditLogEntry> = manager.audit_trail(report.id).try_collect().await.unwrap();
    assert_eq!(trail.len(), 4);

    assert_eq!(trail[0].action, AuditAction::Create);
    assert!(trail[0].old_value.is_none());
    assert_eq!(trail[0].new_value.as_ref().unwrap()["status"], "draft");

    for pair in trail.windows(2) {
        assert_eq!(pair[1].action, AuditAction::Update);
        assert_eq!(pair[1].old_value, pair[0].new_value);
    }
    assert_eq!(trail[2].actor, reviewer.actor);
    assert_eq!(trail[2].new_value.as_ref().unwrap()["status"], "approved");
    assert_eq!(
        trail[3].new_value.as_ref().unwrap()["document_reference"],
        "s3://reports/2026-03.pdf"
    );
}

#[tokio::test]
async fn test_audit_failure_rolls_back_the_mutation() {
    let store = Arc::new(InMemoryComplianceStore::new());
    let company_id = company(&store, true).await;
    let manager = manager(&store);
    let ctx = AuditContext::system("test");

    let report = manager.generate(company_id, 2026, 3, &ctx).await.unwrap();
    store.set_fail_audit_writes(true);

    let err = manager
        .submit_for_review(company_id, report.id, &ctx)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReportError::Store(StoreError::AuditWriteFailure(_))
    ));
    assert_eq!(manager.get(company_id, report.id).await.unwrap(), report);

    let err = manager.generate(company_id, 2026, 4, &ctx).await.unwrap_err();
    assert_eq!(err.error_code(), "AUDIT_WRITE_FAILURE");
    assert!(
        manager
            .reports_for_period(company_id, 2026, 4)
            .await
            .unwrap()
            .is_empty()
    );

    assert_eq!(report_audit(&store).await.len(), 1);
}

#[tokio::test]
async fn test_concurrent_generation_yields_one_report() {
    let store = Arc::new(InMemoryComplianceStore::new());
    let company_id = company(&store, true).await;
    let manager = manager(&store);
    let ctx = AuditContext::system("test");

    let (first, second) = tokio::join!(
        manager.generate(company_id, 2026, 3, &ctx),
        manager.generate(company_id, 2026, 3, &ctx)
    );
    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|r| matches!(
        r,
        Err(ReportError::AlreadyExists { company_id: c, .. }) if *c == company_id
    )));
    assert_eq!(
        manager
            .reports_for_period(company_id, 2026, 3)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_concurrent_generation_across_managers_yields_one_report() {
    let store = Arc::new(InMemoryComplianceStore::new());
    let company_id = company(&store, true).await;
    let (left, right) = (manager(&store), manager(&store));
    let ctx = AuditContext::system("test");

    let (first, second) = tokio::join!(
        left.generate(company_id, 2026, 3, &ctx),
        right.generate(company_id, 2026, 3, &ctx)
    );
    assert_eq!([&first, &second].iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(report_audit(&store).await.len(), 1);
}

#[tokio::test]
async fn test_rejected_report_is_reopened_or_superseded() {
    let store = Arc::new(InMemoryComplianceStore::new());
    let company_id = company(&store, true).await;
    let manager = manager(&store);
    let ctx = AuditContext::system("test");
    let reviewer = AuditContext::user(UserId::new());

    let report = manager.generate(company_id, 2026, 3, &ctx).await.unwrap();

    let err = manager
        .review(
            company_id,
            report.id,
            ReviewDecision::Reject {
                notes: "  ".to_string(),
            },
            &reviewer,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::RejectionNotesRequired));

    let reject = || ReviewDecision::Reject {
        notes: "Gains unexplained".to_string(),
    };
    let rejected = manager
        .review(company_id, report.id, reject(), &reviewer)
        .await
        .unwrap();
    assert_eq!(rejected.status, ReportStatus::Rejected);
    assert_eq!(rejected.history[0].notes.as_deref(), Some("Gains unexplained"));

    let reopened = manager.reopen(company_id, report.id, &ctx).await.unwrap();
    assert_eq!(reopened.status, ReportStatus::Draft);

    manager
        .review(company_id, report.id, reject(), &reviewer)
        .await
        .unwrap();
    let replacement = manager.generate(company_id, 2026, 3, &ctx).await.unwrap();

    let old = manager.get(company_id, report.id).await.unwrap();
    assert_eq!(old.status, ReportStatus::Archived);
    assert_eq!(old.superseded_by, Some(replacement.id));
    assert_eq!(old.history.last().unwrap().event, ReportEvent::Supersede);

    let err = manager.reopen(company_id, report.id, &ctx).await.unwrap_err();
    assert!(matches!(
        err,
        ReportError::InvalidTransition {
            from: ReportStatus::Archived,
            event: ReportEvent::Reopen
        }
    ));
}

#[tokio::test]
async fn test_submitter_cannot_approve_own_report() {
    let store = Arc::new(InMemoryComplianceStore::new());
    let company_id = company(&store, true).await;
    let manager = manager(&store);
    let preparer = AuditContext::user(UserId::new());

    let report = manager.generate(company_id, 2026, 3, &preparer).await.unwrap();
    manager
        .submit_for_review(company_id, report.id, &preparer)
        .await
        .unwrap();

    let err = manager
        .review(company_id, report.id, ReviewDecision::Approve { notes: None }, &preparer)
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::SelfReview));
    assert_eq!(err.status_code(), 403);

    let approved = manager
        .review(
            company_id,
            report.id,
            ReviewDecision::Approve { notes: None },
            &AuditContext::user(UserId::new()),
        )
        .await
        .unwrap();
    assert_eq!(approved.status, ReportStatus::Approved);
}

#[tokio::test]
async fn test_first_period_warns_about_missing_prior_report() {
    let store = Arc::new(InMemoryComplianceStore::new());
    let company_id = company(&store, true).await;
    let manager = manager(&store);

    let report = manager
        .generate(company_id, 2026, 3, &AuditContext::system("test"))
        .await
        .unwrap();
    assert_eq!(report.data.opening_source, OpeningSource::None);
    assert!(report.validation.is_valid());
    assert!(report.validation.warnings.contains(&ValidationWarning::MissingPriorPeriod {
        period: report.period.previous(),
    }));
}

#[tokio::test]
async fn test_prior_closing_carries_forward() {
    let store = Arc::new(InMemoryComplianceStore::new());
    let company_id = company(&store, true).await;
    let manager = manager(&store);
    let ctx = AuditContext::system("test");

    for d in 1..=3 {
        post(&store, company_id, day(3, d), TransactionType::Production, dec!(40)).await;
    }
    post(&store, company_id, day(4, 10), TransactionType::TransferOut, dec!(30)).await;
    post(&store, company_id, day(4, 12), TransactionType::Bottling, dec!(20)).await;

    let march = manager.generate(company_id, 2026, 3, &ctx).await.unwrap();
    assert_eq!(march.data.lines[0].closing, dec!(120));

    let april = manager.generate(company_id, 2026, 4, &ctx).await.unwrap();
    assert_eq!(
        april.data.opening_source,
        OpeningSource::PriorReport {
            report_id: march.id,
            period: march.period,
        }
    );
    let line = &april.data.lines[0];
    assert_eq!(line.opening, dec!(120));
    assert_eq!(line.transfers_out, dec!(30));
    assert_eq!(line.removals.transferred_in_bond, dec!(30));
    assert_eq!(line.bottled, dec!(20));
    assert_eq!(line.closing, dec!(90));
    assert!(
        !april
            .validation
            .warnings
            .iter()
            .any(|w| matches!(w, ValidationWarning::MissingPriorPeriod { .. }))
    );
}

#[tokio::test]
async fn test_late_posting_flags_the_next_period_and_blocks_the_stale_report() {
    let store = Arc::new(InMemoryComplianceStore::new());
    let company_id = company(&store, true).await;
    let manager = manager(&store);
    let ctx = AuditContext::system("test");

    post(&store, company_id, day(3, 2), TransactionType::Production, dec!(100)).await;
    let march = manager.generate(company_id, 2026, 3, &ctx).await.unwrap();
    assert_eq!(march.data.lines[0].closing, dec!(100));

    post(&store, company_id, day(3, 30), TransactionType::Production, dec!(40)).await;

    let april = manager.generate(company_id, 2026, 4, &ctx).await.unwrap();
    assert_eq!(april.data.lines[0].opening, dec!(100));
    assert!(april.validation.warnings.contains(&ValidationWarning::PriorPeriodChanged {
        period: march.period,
        product_type: "BOURBON".to_string(),
        spirits_class: SpiritsClass::WhiskyUnder160,
        reported: dec!(100),
        current: dec!(140),
    }));

    let err = manager
        .submit_for_review(company_id, march.id, &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::ValidationBlocked { errors: 1 }));
    assert_eq!(manager.get(company_id, march.id).await.unwrap(), march);

    let failed = manager.validate(company_id, march.id, &ctx).await.unwrap();
    assert_eq!(failed.status, ReportStatus::ValidationFailed);
    assert_eq!(
        failed.validation.errors,
        vec![ValidationError::ReconciliationImbalance {
            product_type: "BOURBON".to_string(),
            spirits_class: SpiritsClass::WhiskyUnder160,
            expected: dec!(140),
            reported: dec!(100),
            difference: dec!(40),
        }]
    );

    let retried = manager.retry(company_id, march.id, &ctx).await.unwrap();
    assert_eq!(retried.data.lines[0].closing, dec!(140));
    let submitted = manager
        .submit_for_review(company_id, march.id, &ctx)
        .await
        .unwrap();
    assert_eq!(submitted.status, ReportStatus::PendingReview);
}

#[tokio::test]
async fn test_opening_source_status_is_reported() {
    let store = Arc::new(InMemoryComplianceStore::new());
    let company_id = company(&store, true).await;
    let manager = manager(&store);
    let ctx = AuditContext::system("test");
    let reviewer = AuditContext::user(UserId::new());

    post(&store, company_id, day(2, 5), TransactionType::Production, dec!(10)).await;
    let february = manager.generate(company_id, 2026, 2, &ctx).await.unwrap();

    let march = manager.generate(company_id, 2026, 3, &ctx).await.unwrap();
    assert_eq!(march.data.lines[0].opening, dec!(10));
    assert!(march.validation.warnings.contains(&ValidationWarning::PriorPeriodUnapproved {
        period: february.period,
        report_id: february.id,
        status: ReportStatus::Draft,
    }));

    let may = manager.generate(company_id, 2026, 5, &ctx).await.unwrap();
    manager
        .review(
            company_id,
            may.id,
            ReviewDecision::Reject {
                notes: "Recount".to_string(),
            },
            &reviewer,
        )
        .await
        .unwrap();
    let june = manager.generate(company_id, 2026, 6, &ctx).await.unwrap();
    assert_eq!(june.data.opening_source, OpeningSource::None);
    assert!(june.validation.warnings.contains(&ValidationWarning::MissingPriorPeriod {
        period: may.period,
    }));
    assert!(
        !june
            .validation
            .warnings
            .iter()
            .any(|w| matches!(w, ValidationWarning::PriorPeriodUnapproved { .. }))
    );
}

#[tokio::test]
async fn test_documents_attach_only_after_approval() {
    let store = Arc::new(InMemoryComplianceStore::new());
    let company_id = company(&store, true).await;
    let manager = manager(&store);
    let ctx = AuditContext::system("test");

    let report = manager.generate(company_id, 2026, 3, &ctx).await.unwrap();
    let err = manager
        .attach_document(company_id, report.id, "doc-1", &ctx)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReportError::DocumentNotAttachable {
            status: ReportStatus::Draft
        }
    ));

    let err = manager
        .attach_document(company_id, report.id, " ", &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::DocumentReferenceRequired));
}

#[tokio::test]
async fn test_listeners_see_committed_transitions() {
    let store = Arc::new(InMemoryComplianceStore::new());
    let company_id = company(&store, true).await;
    let recorder = Arc::new(Recorder::default());
    let manager = manager(&store).with_listener(recorder.clone());
    let ctx = AuditContext::system("test");

    let report = manager.generate(company_id, 2026, 3, &ctx).await.unwrap();
    manager.submit_for_review(company_id, report.id, &ctx).await.unwrap();
    store.set_fail_audit_writes(true);
    let reviewer = AuditContext::user(UserId::new());
    manager
        .review(company_id, report.id, ReviewDecision::Approve { notes: None }, &reviewer)
        .await
        .unwrap_err();

    let notices = recorder.0.lock().unwrap().clone();
    let steps: Vec<(Option<ReportStatus>, ReportStatus)> =
        notices.iter().map(|n| (n.from, n.to)).collect();
    assert_eq!(
        steps,
        vec![
            (None, ReportStatus::Draft),
            (Some(ReportStatus::Draft), ReportStatus::PendingReview),
        ]
    );
    assert!(notices.iter().all(|n| n.report_id == report.id));
}

#[tokio::test]
async fn test_generate_requires_profile_and_valid_period() {
    let store = Arc::new(InMemoryComplianceStore::new());
    let manager = manager(&store);
    let ctx = AuditContext::system("test");

    let err = manager.generate(CompanyId::new(), 2026, 3, &ctx).await.unwrap_err();
    assert!(matches!(err, ReportError::CompanyNotFound(_)));

    let company_id = company(&store, true).await;
    let err = manager.generate(company_id, 2026, 13, &ctx).await.unwrap_err();
    assert_eq!(err.error_code(), "INVALID_PERIOD");
}
