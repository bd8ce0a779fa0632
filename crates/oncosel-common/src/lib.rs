//! oncosel-common — Shared types, errors, and configuration used across
//! all Oncosel crates.

pub mod error;
pub mod entities;
pub mod config;
pub mod http;

// Re-export commonly used types
pub use config::{ConfidenceConfig, DrugPanel, GateConfig};
pub use entities::{DrugCandidate, MoaClass, TumorContext, Variant};
pub use error::{OncoselError, Result};
