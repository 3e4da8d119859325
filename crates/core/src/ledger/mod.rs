//! Append-only spirits inventory journal.
//!
//! - `types` - Ledger domain types (LedgerTransaction, TransactionType, SpiritsClass, TaxStatus)
//! - `error` - Ledger-specific error types
//! - `service` - Recording, correcting and streaming transactions

pub mod error;
pub mod service;
pub mod types;

pub use error::LedgerError;
pub use service::{LedgerCorrection, LedgerService};
pub use types::{
    LedgerCursor, LedgerQuery, LedgerTransaction, NewLedgerTransaction, SourceRef, SpiritsClass,
    TaxStatus, TransactionType,
};
