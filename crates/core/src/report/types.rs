//! Report domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use stillhouse_shared::types::{CompanyId, ReportId};

use crate::audit::Actor;
use crate::company::FormType;
use crate::period::ReportPeriod;
use crate::reconciliation::MonthlyReportData;
use crate::report::error::ReportError;
use crate::report::state_machine::ReportStateMachine;
use crate::report::validation::ValidationReport;

/// Lifecycle status of a monthly report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Generated, editable by regeneration, not yet reviewed.
    Draft,
    /// Validation found errors; must be retried.
    ValidationFailed,
    /// Waiting for a reviewer.
    PendingReview,
    /// Approved for filing.
    Approved,
    /// Filed with the regulator.
    Submitted,
    /// Closed; terminal.
    Archived,
    /// Sent back by a reviewer.
    Rejected,
}

impl ReportStatus {
    /// All statuses.
    pub const ALL: [Self; 7] = [
        Self::Draft,
        Self::ValidationFailed,
        Self::PendingReview,
        Self::Approved,
        Self::Submitted,
        Self::Archived,
        Self::Rejected,
    ];

    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::ValidationFailed => "validation_failed",
            Self::PendingReview => "pending_review",
            Self::Approved => "approved",
            Self::Submitted => "submitted",
            Self::Archived => "archived",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events that drive the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportEvent {
    /// Validation found errors.
    FailValidation,
    /// Re-run generation after a validation failure.
    Retry,
    /// Hand the report to a reviewer.
    SubmitForReview,
    /// Reviewer approves.
    Approve,
    /// Reviewer rejects.
    Reject,
    /// Reopen a rejected report for rework.
    Reopen,
    /// Record filing with the regulator.
    MarkSubmitted,
    /// Close a filed report.
    Archive,
    /// Close a rejected report replaced by a newer one.
    Supersede,
}

impl ReportEvent {
    /// All events.
    pub const ALL: [Self; 9] = [
        Self::FailValidation,
        Self::Retry,
        Self::SubmitForReview,
        Self::Approve,
        Self::Reject,
        Self::Reopen,
        Self::MarkSubmitted,
        Self::Archive,
        Self::Supersede,
    ];

    /// Returns the string representation of the event.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FailValidation => "fail_validation",
            Self::Retry => "retry",
            Self::SubmitForReview => "submit_for_review",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Reopen => "reopen",
            Self::MarkSubmitted => "mark_submitted",
            Self::Archive => "archive",
            Self::Supersede => "supersede",
        }
    }
}

impl fmt::Display for ReportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One applied transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Status before.
    pub from: ReportStatus,
    /// Status after.
    pub to: ReportStatus,
    /// Triggering event.
    pub event: ReportEvent,
    /// Who triggered it.
    pub actor: Actor,
    /// When.
    pub at: DateTime<Utc>,
    /// Reviewer or operator notes.
    pub notes: Option<String>,
}

/// A reviewer's verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    /// Approve, optionally with notes.
    Approve {
        /// Optional notes.
        notes: Option<String>,
    },
    /// Reject; notes are required.
    Reject {
        /// Why the report was rejected.
        notes: String,
    },
}

/// A persisted monthly compliance report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyReport {
    /// Unique identifier.
    pub id: ReportId,
    /// Reporting company.
    pub company_id: CompanyId,
    /// Reporting period.
    pub period: ReportPeriod,
    /// Regulator form.
    pub form_type: FormType,
    /// Lifecycle status.
    pub status: ReportStatus,
    /// Reconciled data snapshot.
    pub data: MonthlyReportData,
    /// Latest validation snapshot.
    pub validation: ValidationReport,
    /// Every applied transition, oldest first.
    pub history: Vec<TransitionRecord>,
    /// Who generated the report.
    pub generated_by: Actor,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Who handed the report to review.
    pub submitted_for_review_by: Option<Actor>,
    /// When the report was handed to review.
    pub submitted_for_review_at: Option<DateTime<Utc>>,
    /// Who reviewed the report.
    pub reviewed_by: Option<Actor>,
    /// When the report was reviewed.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Reviewer notes.
    pub review_notes: Option<String>,
    /// When the report was filed with the regulator.
    pub submitted_at: Option<DateTime<Utc>>,
    /// Regulator confirmation number.
    pub confirmation_number: Option<String>,
    /// Rendered document reference.
    pub document_reference: Option<String>,
    /// The report that replaced this one after rejection.
    pub superseded_by: Option<ReportId>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl MonthlyReport {
    /// A fresh Draft.
    #[must_use]
    pub fn draft(
        form_type: FormType,
        data: MonthlyReportData,
        validation: ValidationReport,
        generated_by: Actor,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ReportId::new(),
            company_id: data.company_id,
            period: data.period,
            form_type,
            status: ReportStatus::Draft,
            data,
            validation,
            history: Vec::new(),
            generated_by,
            generated_at: now,
            submitted_for_review_by: None,
            submitted_for_review_at: None,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            submitted_at: None,
            confirmation_number: None,
            document_reference: None,
            superseded_by: None,
            updated_at: now,
        }
    }

    /// Returns true if this report blocks another from being generated for
    /// its period.
    #[must_use]
    pub fn occupies_period(&self) -> bool {
        self.status != ReportStatus::Rejected && self.superseded_by.is_none()
    }

    /// Applies `event` through the transition table and records it.
    pub fn apply(
        &mut self,
        event: ReportEvent,
        actor: &Actor,
        at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<ReportStatus, ReportError> {
        let to = ReportStateMachine::next(self.status, event)?;
        self.history.push(TransitionRecord {
            from: self.status,
            to,
            event,
            actor: actor.clone(),
            at,
            notes,
        });
        self.status = to;
        self.updated_at = at;
        Ok(to)
    }
}
