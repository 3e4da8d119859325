//! Shared types and configuration for Stillhouse.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Gallon and currency rounding rules
//! - Configuration management

pub mod config;
pub mod types;

pub use config::AppConfig;
