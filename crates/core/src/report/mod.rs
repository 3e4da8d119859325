//! Monthly compliance report lifecycle.
//!
//! - `types` - Report domain types (MonthlyReport, ReportStatus, ReportEvent)
//! - `error` - Report-specific error types
//! - `state_machine` - The transition table
//! - `validation` - Error and warning rules over report data
//! - `listener` - Post-commit transition notifications
//! - `manager` - Generation and every lifecycle operation

pub mod error;
pub mod listener;
pub mod manager;
pub mod state_machine;
pub mod types;
pub mod validation;

#[cfg(test)]
mod manager_tests;
#[cfg(test)]
mod state_machine_props;

pub use error::ReportError;
pub use listener::{TransitionListener, TransitionNotice};
pub use manager::ReportLifecycleManager;
pub use state_machine::ReportStateMachine;
pub use types::{MonthlyReport, ReportEvent, ReportStatus, ReviewDecision, TransitionRecord};
pub use validation::{ReportValidator, ValidationError, ValidationReport, ValidationWarning};
