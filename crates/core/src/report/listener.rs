//! Post-commit transition notifications.

use chrono::{DateTime, Utc};
use serde::Serialize;
use stillhouse_shared::types::{CompanyId, ReportId};

use crate::audit::Actor;
use crate::period::ReportPeriod;
use crate::report::types::ReportStatus;

/// A committed report status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionNotice {
    /// The report.
    pub report_id: ReportId,
    /// Its company.
    pub company_id: CompanyId,
    /// Its period.
    pub period: ReportPeriod,
    /// Status before; `None` when the report was just generated.
    pub from: Option<ReportStatus>,
    /// Status after.
    pub to: ReportStatus,
    /// Who caused the change.
    pub actor: Actor,
    /// When.
    pub at: DateTime<Utc>,
}

/// Receives notices after each committed transition.
///
/// Called inline on the task that committed; implementations that deliver
/// over the network should hand off to their own queue.
pub trait TransitionListener: Send + Sync {
    /// Handles one notice.
    fn on_transition(&self, notice: &TransitionNotice);
}
