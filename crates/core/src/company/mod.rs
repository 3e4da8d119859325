//! Company compliance profiles and report schedules.

pub mod error;
pub mod profile;
pub mod schedule;
pub mod service;

pub use error::CompanyError;
pub use profile::{CompanyProfile, FormType};
pub use schedule::{ReportCadence, ReportSchedule};
pub use service::CompanyService;
