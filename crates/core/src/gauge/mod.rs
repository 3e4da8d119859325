//! Barrel gauge normalization.
//!
//! - `types` - Gauge domain types (GaugeRecord, GaugeMeasurement, GaugePurpose)
//! - `error` - Gauge-specific error types
//! - `processor` - Temperature correction and proof-gallon derivation
//! - `service` - Persisting, correcting and listing gauges

pub mod error;
pub mod processor;
pub mod service;
pub mod types;

#[cfg(test)]
mod processor_props;

pub use error::GaugeError;
pub use processor::GaugeProcessor;
pub use service::GaugeService;
pub use types::{GaugeMeasurement, GaugePurpose, GaugeRecord, NormalizedGauge};
