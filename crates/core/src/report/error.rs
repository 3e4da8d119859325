//! Report lifecycle error types.

use stillhouse_shared::types::{CompanyId, ReportId};
use thiserror::Error;

use crate::period::{PeriodError, ReportPeriod};
use crate::report::types::{ReportEvent, ReportStatus};
use crate::store::StoreError;

/// Errors that can occur while generating or transitioning reports.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Report not found.
    #[error("Report {0} not found")]
    NotFound(ReportId),

    /// Another report already occupies the period.
    #[error("A report for company {company_id} period {period} already exists")]
    AlreadyExists {
        /// The company.
        company_id: CompanyId,
        /// The occupied period.
        period: ReportPeriod,
    },

    /// The transition table has no row for this status and event.
    #[error("Cannot {event} a report in status {from}")]
    InvalidTransition {
        /// The current status.
        from: ReportStatus,
        /// The rejected event.
        event: ReportEvent,
    },

    /// Validation errors prevent the report from leaving Draft.
    #[error("Report has {errors} validation error(s)")]
    ValidationBlocked {
        /// Number of blocking errors.
        errors: usize,
    },

    /// Rejection notes are required but not provided.
    #[error("Rejection notes are required")]
    RejectionNotesRequired,

    /// The reviewer submitted the report for review themselves.
    #[error("A report cannot be approved by the actor who submitted it for review")]
    SelfReview,

    /// Confirmation number is required but not provided.
    #[error("Confirmation number is required")]
    ConfirmationNumberRequired,

    /// Document reference is required but not provided.
    #[error("Document reference is required")]
    DocumentReferenceRequired,

    /// Documents attach only to approved or submitted reports.
    #[error("Cannot attach a document to a report in status {status}")]
    DocumentNotAttachable {
        /// The current status.
        status: ReportStatus,
    },

    /// The company has no compliance profile.
    #[error("Company {0} has no compliance profile")]
    CompanyNotFound(CompanyId),

    /// Invalid period.
    #[error(transparent)]
    Period(#[from] PeriodError),

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReportError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidTransition { .. }
            | Self::RejectionNotesRequired
            | Self::ConfirmationNumberRequired
            | Self::DocumentReferenceRequired
            | Self::DocumentNotAttachable { .. }
            | Self::Period(_) => 400,
            Self::SelfReview => 403,
            Self::NotFound(_) | Self::CompanyNotFound(_) => 404,
            Self::AlreadyExists { .. } => 409,
            Self::ValidationBlocked { .. } => 422,
            Self::Store(e) => e.status_code(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "REPORT_NOT_FOUND",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::ValidationBlocked { .. } => "VALIDATION_BLOCKED",
            Self::RejectionNotesRequired => "REJECTION_NOTES_REQUIRED",
            Self::SelfReview => "SELF_REVIEW",
            Self::ConfirmationNumberRequired => "CONFIRMATION_NUMBER_REQUIRED",
            Self::DocumentReferenceRequired => "DOCUMENT_REFERENCE_REQUIRED",
            Self::DocumentNotAttachable { .. } => "DOCUMENT_NOT_ATTACHABLE",
            Self::CompanyNotFound(_) => "COMPANY_NOT_FOUND",
            Self::Period(_) => "INVALID_PERIOD",
            Self::Store(e) => e.error_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_error() {
        let err = ReportError::InvalidTransition {
            from: ReportStatus::Draft,
            event: ReportEvent::MarkSubmitted,
        };
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("mark_submitted"));
        assert!(err.to_string().contains("draft"));
    }

    #[test]
    fn test_already_exists_error() {
        let err = ReportError::AlreadyExists {
            company_id: CompanyId::new(),
            period: ReportPeriod::new(2026, 3).unwrap(),
        };
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "ALREADY_EXISTS");
        assert!(err.to_string().contains("2026-03"));
    }

    #[test]
    fn test_store_errors_pass_through() {
        let err = ReportError::from(StoreError::AuditWriteFailure("disk full".into()));
        assert_eq!(err.error_code(), "AUDIT_WRITE_FAILURE");
        assert_eq!(err.status_code(), 500);
    }
}
