//! Panel and policy configuration.
//!
//! The drug panel and every clinical-policy threshold are explicit,
//! immutable configuration objects constructed once (at startup or per
//! request) and passed by reference into the scoring components.
//! Numeric defaults are policy constants from the source documentation
//! and are overridable via YAML without a code change.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::entities::{DrugCandidate, MoaClass};
use crate::error::{OncoselError, Result};

// ── Confidence thresholds ────────────────────────────────────────────────────

/// Thresholds driving tier classification and confidence formulas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    /// Evidence strength at or above which a drug is `supported`.
    #[serde(default = "default_evidence_gate")]
    pub evidence_gate: f64,

    /// Pathway score at or above which a ClinVar-Strong variant
    /// counts as pathway-aligned for the supported tier.
    #[serde(default = "default_pathway_alignment")]
    pub pathway_alignment: f64,

    /// Sequence disruption below which (together with weak pathway
    /// and evidence signal) a drug is `insufficient`.
    #[serde(default = "default_insufficient_signal")]
    pub insufficient_signal: f64,

    /// Partial-credit mode: insufficient-tier drugs still receive a
    /// low-capped confidence instead of 0.0.
    #[serde(default)]
    pub fusion_engine_active: bool,
}

fn default_evidence_gate() -> f64 { 0.7 }
fn default_pathway_alignment() -> f64 { 0.2 }
fn default_insufficient_signal() -> f64 { 0.02 }

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            evidence_gate: default_evidence_gate(),
            pathway_alignment: default_pathway_alignment(),
            insufficient_signal: default_insufficient_signal(),
            fusion_engine_active: false,
        }
    }
}

impl ConfidenceConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("evidence_gate", self.evidence_gate),
            ("pathway_alignment", self.pathway_alignment),
            ("insufficient_signal", self.insufficient_signal),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(OncoselError::Config(format!(
                    "confidence threshold {name} = {v} outside [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

// ── Sporadic gate policy ─────────────────────────────────────────────────────

/// Tumor-context-conditioned adjustment policy. Each rule is
/// independently toggleable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// HRD score at or above which the PARP-class penalty is waived.
    /// Default 42.0: the Telli 2016 HRD assay clinical cutoff.
    #[serde(default = "default_hrd_rescue")]
    pub hrd_rescue_threshold: f64,

    /// Multiplicative penalty for HRD-requiring drugs in
    /// germline-negative, HRD-low tumors.
    #[serde(default = "default_parp_penalty")]
    pub parp_penalty_factor: f64,

    /// TMB (mut/Mb) at or above which the IO boost applies.
    /// Default 10.0: the KEYNOTE-158 cutoff.
    #[serde(default = "default_tmb_boost")]
    pub tmb_boost_threshold: f64,

    /// Multiplicative boost for immune-checkpoint drugs in TMB-high
    /// or MSI-high tumors.
    #[serde(default = "default_io_boost")]
    pub io_boost_factor: f64,

    /// Confidence ceiling when exactly one biomarker is present.
    #[serde(default = "default_cap_one")]
    pub completeness_cap_one: f64,

    /// Confidence ceiling when no biomarkers are present.
    #[serde(default = "default_cap_zero")]
    pub completeness_cap_zero: f64,

    #[serde(default = "default_true")]
    pub enable_parp_gate: bool,
    #[serde(default = "default_true")]
    pub enable_io_gate: bool,
    #[serde(default = "default_true")]
    pub enable_completeness_cap: bool,
}

fn default_hrd_rescue() -> f64 { 42.0 }
fn default_parp_penalty() -> f64 { 0.5 }
fn default_tmb_boost() -> f64 { 10.0 }
fn default_io_boost() -> f64 { 1.35 }
fn default_cap_one() -> f64 { 0.6 }
fn default_cap_zero() -> f64 { 0.4 }
fn default_true() -> bool { true }

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            hrd_rescue_threshold: default_hrd_rescue(),
            parp_penalty_factor: default_parp_penalty(),
            tmb_boost_threshold: default_tmb_boost(),
            io_boost_factor: default_io_boost(),
            completeness_cap_one: default_cap_one(),
            completeness_cap_zero: default_cap_zero(),
            enable_parp_gate: true,
            enable_io_gate: true,
            enable_completeness_cap: true,
        }
    }
}

impl GateConfig {
    pub fn validate(&self) -> Result<()> {
        if self.parp_penalty_factor <= 0.0 || self.parp_penalty_factor > 1.0 {
            return Err(OncoselError::Config(format!(
                "parp_penalty_factor = {} outside (0, 1]", self.parp_penalty_factor
            )));
        }
        if self.io_boost_factor < 1.0 {
            return Err(OncoselError::Config(format!(
                "io_boost_factor = {} below 1.0", self.io_boost_factor
            )));
        }
        if self.completeness_cap_zero > self.completeness_cap_one {
            return Err(OncoselError::Config(
                "zero-biomarker cap must not exceed one-biomarker cap".into(),
            ));
        }
        Ok(())
    }
}

// ── Drug panel ───────────────────────────────────────────────────────────────

/// Versioned, static list of drug candidates. Extensible via YAML
/// without a code change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugPanel {
    #[serde(default = "default_panel_version")]
    pub version: String,
    pub drugs: Vec<DrugCandidate>,
}

fn default_panel_version() -> String { "builtin-1".to_string() }

impl DrugPanel {
    /// Load from a YAML panel file.
    pub fn from_yaml(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| OncoselError::Config(format!("panel file {path}: {e}")))?;
        let panel: Self = serde_yaml::from_str(&content)
            .map_err(|e| OncoselError::Config(format!("panel file {path}: {e}")))?;
        panel.validate()?;
        Ok(panel)
    }

    /// Startup validation: weight ranges, duplicate names.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for drug in &self.drugs {
            if drug.name.trim().is_empty() {
                return Err(OncoselError::Config("drug with empty name in panel".into()));
            }
            if !seen.insert(drug.name.clone()) {
                return Err(OncoselError::Config(format!("duplicate drug {} in panel", drug.name)));
            }
            for (pathway, w) in &drug.pathway_weights {
                if !(0.0..=1.0).contains(w) {
                    return Err(OncoselError::Config(format!(
                        "{}: pathway weight {pathway} = {w} outside [0, 1]", drug.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Compiled-in default panel covering the major MoA classes.
    pub fn builtin() -> Self {
        fn weights(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
            pairs.iter().map(|(p, w)| (p.to_string(), *w)).collect()
        }

        let drugs = vec![
            DrugCandidate {
                name: "Olaparib".into(),
                moa: "PARP inhibitor".into(),
                moa_class: MoaClass::ParpInhibitor,
                pathway_weights: weights(&[("ddr", 1.0), ("cell_cycle", 0.3)]),
            },
            DrugCandidate {
                name: "Niraparib".into(),
                moa: "PARP inhibitor".into(),
                moa_class: MoaClass::ParpInhibitor,
                pathway_weights: weights(&[("ddr", 1.0)]),
            },
            DrugCandidate {
                name: "Pembrolizumab".into(),
                moa: "anti-PD-1 immune checkpoint inhibitor".into(),
                moa_class: MoaClass::ImmuneCheckpoint,
                pathway_weights: weights(&[("immune_evasion", 1.0), ("ddr", 0.2)]),
            },
            DrugCandidate {
                name: "Carboplatin".into(),
                moa: "platinum DNA-crosslinking agent".into(),
                moa_class: MoaClass::PlatinumChemo,
                pathway_weights: weights(&[("ddr", 0.8), ("cell_cycle", 0.4)]),
            },
            DrugCandidate {
                name: "Osimertinib".into(),
                moa: "EGFR tyrosine kinase inhibitor".into(),
                moa_class: MoaClass::EgfrTki,
                pathway_weights: weights(&[("rtk_ras", 1.0), ("pi3k_akt", 0.4)]),
            },
            DrugCandidate {
                name: "Palbociclib".into(),
                moa: "CDK4/6 inhibitor".into(),
                moa_class: MoaClass::Cdk46Inhibitor,
                pathway_weights: weights(&[("cell_cycle", 1.0)]),
            },
            DrugCandidate {
                name: "Bevacizumab".into(),
                moa: "anti-VEGF angiogenesis inhibitor".into(),
                moa_class: MoaClass::AntiAngiogenic,
                pathway_weights: weights(&[("angiogenesis", 1.0)]),
            },
        ];

        Self { version: default_panel_version(), drugs }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_panel_is_valid() {
        let panel = DrugPanel::builtin();
        assert!(panel.validate().is_ok());
        assert!(panel.drugs.iter().any(|d| d.moa_class == MoaClass::ParpInhibitor));
        assert!(panel.drugs.iter().any(|d| d.moa_class == MoaClass::ImmuneCheckpoint));
    }

    #[test]
    fn test_panel_rejects_bad_weight() {
        let mut panel = DrugPanel::builtin();
        panel.drugs[0].pathway_weights.insert("ddr".into(), 1.5);
        assert!(matches!(panel.validate(), Err(OncoselError::Config(_))));
    }

    #[test]
    fn test_panel_rejects_duplicate_drug() {
        let mut panel = DrugPanel::builtin();
        let dup = panel.drugs[0].clone();
        panel.drugs.push(dup);
        assert!(panel.validate().is_err());
    }

    #[test]
    fn test_confidence_defaults() {
        let cfg = ConfidenceConfig::default();
        assert_eq!(cfg.evidence_gate, 0.7);
        assert_eq!(cfg.pathway_alignment, 0.2);
        assert_eq!(cfg.insufficient_signal, 0.02);
        assert!(!cfg.fusion_engine_active);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_gate_config_validation() {
        let mut cfg = GateConfig::default();
        assert!(cfg.validate().is_ok());
        cfg.io_boost_factor = 0.8;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let panel = DrugPanel::builtin();
        let yaml = serde_yaml::to_string(&panel).unwrap();
        let parsed: DrugPanel = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(panel.drugs.len(), parsed.drugs.len());
        assert_eq!(panel.version, parsed.version);
    }
}
