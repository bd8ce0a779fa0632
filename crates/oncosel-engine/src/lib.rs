//! oncosel-engine — Efficacy fusion pipeline.
//!
//! Composes sequence scoring, pathway aggregation, evidence and
//! insights lookups into per-drug evidence tiers and confidences,
//! applies the sporadic-gate policy, and assembles the ranked,
//! auditable response.

pub mod pathway;
pub mod confidence;
pub mod gates;
pub mod orchestrator;

pub use confidence::FusionWeights;
pub use gates::{AdjustmentRecord, GateRule};
pub use orchestrator::{
    EfficacyEngine, EfficacyResult, PredictOptions, PredictionRequest, VariantInput,
};
