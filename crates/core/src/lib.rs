//! Core business logic for Stillhouse.
//!
//! This crate contains the compliance engine with ZERO web or database
//! dependencies. Persistence is reached only through the [`store`] traits.
//!
//! # Modules
//!
//! - `gauge` - Barrel gauge normalization and recording
//! - `ledger` - Append-only inventory ledger and its streaming queries
//! - `reconciliation` - Monthly per-product inventory reconciliation
//! - `excise` - Tiered excise tax determination
//! - `report` - Monthly report generation and lifecycle
//! - `audit` - Before/after audit entries and export streams
//! - `company` - Compliance profiles and report schedules
//! - `period` - Report periods and date ranges
//! - `settings` - Validated engine settings
//! - `store` - Persistence traits and the in-memory store

pub mod audit;
pub mod company;
pub mod excise;
pub mod gauge;
pub mod ledger;
pub mod period;
pub mod reconciliation;
pub mod report;
pub mod settings;
pub mod store;

pub use settings::{ComplianceSettings, SettingsError};
