//! Property-based tests for the report transition table.

use proptest::prelude::*;

use crate::report::state_machine::ReportStateMachine;
use crate::report::types::{ReportEvent, ReportStatus};

const TABLE: [(ReportStatus, ReportEvent, ReportStatus); 10] = [
    (ReportStatus::Draft, ReportEvent::FailValidation, ReportStatus::ValidationFailed),
    (ReportStatus::ValidationFailed, ReportEvent::Retry, ReportStatus::Draft),
    (ReportStatus::Draft, ReportEvent::SubmitForReview, ReportStatus::PendingReview),
    (ReportStatus::PendingReview, ReportEvent::Approve, ReportStatus::Approved),
    (ReportStatus::PendingReview, ReportEvent::Reject, ReportStatus::Rejected),
    (ReportStatus::Draft, ReportEvent::Reject, ReportStatus::Rejected),
    (ReportStatus::Rejected, ReportEvent::Reopen, ReportStatus::Draft),
    (ReportStatus::Approved, ReportEvent::MarkSubmitted, ReportStatus::Submitted),
    (ReportStatus::Submitted, ReportEvent::Archive, ReportStatus::Archived),
    (ReportStatus::Rejected, ReportEvent::Supersede, ReportStatus::Archived),
];

fn arb_status() -> impl Strategy<Value = ReportStatus> {
    proptest::sample::select(ReportStatus::ALL.to_vec())
}

fn arb_event() -> impl Strategy<Value = ReportEvent> {
    proptest::sample::select(ReportEvent::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A transition succeeds exactly when the table lists it.
    #[test]
    fn prop_transition_matches_table(status in arb_status(), event in arb_event()) {
        let expected = TABLE
            .iter()
            .find(|(from, e, _)| *from == status && *e == event)
            .map(|(_, _, to)| *to);
        prop_assert_eq!(ReportStateMachine::transition(status, event), expected);
        prop_assert_eq!(ReportStateMachine::next(status, event).is_ok(), expected.is_some());
    }

    /// Any event sequence that reaches Submitted passed through Approved.
    #[test]
    fn prop_submitted_requires_approval(events in prop::collection::vec(arb_event(), 0..20)) {
        let mut status = ReportStatus::Draft;
        let mut approved = false;
        for event in events {
            if let Some(next) = ReportStateMachine::transition(status, event) {
                status = next;
                approved |= status == ReportStatus::Approved;
                if status == ReportStatus::Submitted {
                    prop_assert!(approved);
                }
            }
        }
    }

    /// Once archived, nothing moves the report.
    #[test]
    fn prop_archived_absorbs_every_event(event in arb_event()) {
        prop_assert!(ReportStateMachine::transition(ReportStatus::Archived, event).is_none());
    }
}
