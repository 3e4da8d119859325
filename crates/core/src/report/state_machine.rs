//! Report transition table.
//!
//! | From             | Event           | To               |
//! |------------------|-----------------|------------------|
//! | Draft            | FailValidation  | ValidationFailed |
//! | ValidationFailed | Retry           | Draft            |
//! | Draft            | SubmitForReview | PendingReview    |
//! | PendingReview    | Approve         | Approved         |
//! | PendingReview    | Reject          | Rejected         |
//! | Draft            | Reject          | Rejected         |
//! | Rejected         | Reopen          | Draft            |
//! | Approved         | MarkSubmitted   | Submitted        |
//! | Submitted        | Archive         | Archived         |
//! | Rejected         | Supersede       | Archived         |

use crate::report::error::ReportError;
use crate::report::types::{ReportEvent, ReportStatus};

/// Resolves lifecycle events against the transition table.
pub struct ReportStateMachine;

impl ReportStateMachine {
    /// The status `event` leads to from `from`, if the table allows it.
    #[must_use]
    pub fn transition(from: ReportStatus, event: ReportEvent) -> Option<ReportStatus> {
        use ReportEvent as E;
        use ReportStatus as S;

        // No wildcard arms: a new event or status must be placed in every row.
        match from {
            S::Draft => match event {
                E::FailValidation => Some(S::ValidationFailed),
                E::SubmitForReview => Some(S::PendingReview),
                E::Reject => Some(S::Rejected),
                E::Retry
                | E::Approve
                | E::Reopen
                | E::MarkSubmitted
                | E::Archive
                | E::Supersede => None,
            },
            S::ValidationFailed => match event {
                E::Retry => Some(S::Draft),
                E::FailValidation
                | E::SubmitForReview
                | E::Approve
                | E::Reject
                | E::Reopen
                | E::MarkSubmitted
                | E::Archive
                | E::Supersede => None,
            },
            S::PendingReview => match event {
                E::Approve => Some(S::Approved),
                E::Reject => Some(S::Rejected),
                E::FailValidation
                | E::Retry
                | E::SubmitForReview
                | E::Reopen
                | E::MarkSubmitted
                | E::Archive
                | E::Supersede => None,
            },
            S::Approved => match event {
                E::MarkSubmitted => Some(S::Submitted),
                E::FailValidation
                | E::Retry
                | E::SubmitForReview
                | E::Approve
                | E::Reject
                | E::Reopen
                | E::Archive
                | E::Supersede => None,
            },
            S::Submitted => match event {
                E::Archive => Some(S::Archived),
                E::FailValidation
                | E::Retry
                | E::SubmitForReview
                | E::Approve
                | E::Reject
                | E::Reopen
                | E::MarkSubmitted
                | E::Supersede => None,
            },
            S::Rejected => match event {
                E::Reopen => Some(S::Draft),
                E::Supersede => Some(S::Archived),
                E::FailValidation
                | E::Retry
                | E::SubmitForReview
                | E::Approve
                | E::Reject
                | E::MarkSubmitted
                | E::Archive => None,
            },
            S::Archived => match event {
                E::FailValidation
                | E::Retry
                | E::SubmitForReview
                | E::Approve
                | E::Reject
                | E::Reopen
                | E::MarkSubmitted
                | E::Archive
                | E::Supersede => None,
            },
        }
    }

    /// Like [`Self::transition`], failing with `ReportError::InvalidTransition`.
    pub fn next(from: ReportStatus, event: ReportEvent) -> Result<ReportStatus, ReportError> {
        Self::transition(from, event).ok_or(ReportError::InvalidTransition { from, event })
    }

    /// Events accepted in `status`.
    #[must_use]
    pub fn allowed_events(status: ReportStatus) -> Vec<ReportEvent> {
        ReportEvent::ALL
            .into_iter()
            .filter(|e| Self::transition(status, *e).is_some())
            .collect()
    }

    /// Returns true if no event leaves `status`.
    #[must_use]
    pub fn is_terminal(status: ReportStatus) -> bool {
        Self::allowed_events(status).is_empty()
    }
}
