//! Immutable audit trail for compliance entities.
//!
//! - `types` - Audit domain types (AuditLogEntry, Actor, AuditContext, AuditFilter)
//! - `logger` - Snapshot capture and the exportable audit stream

pub mod logger;
pub mod types;

pub use logger::AuditLogger;
pub use types::{
    Actor, AuditAction, AuditContext, AuditCursor, AuditEntityType, AuditFilter, AuditLogEntry,
    NewAuditEntry, RequestMetadata,
};
