//! Sporadic gate policy.
//!
//! Deterministic, rule-ordered adjustments conditioned on the tumor
//! biomarker context, applied on top of the base fusion score. Every
//! rule that fires (or deliberately withholds) appends a record with
//! before/after values — nothing silently overwrites anything.

use serde::{Deserialize, Serialize};
use tracing::debug;

use oncosel_common::config::GateConfig;
use oncosel_common::entities::{DrugCandidate, GermlineStatus, MsiStatus, TumorContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateRule {
    ParpPenalty,
    ParpRescue,
    IoBoost,
    IoInsufficientSignal,
    CompletenessCap,
}

impl GateRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateRule::ParpPenalty          => "parp_penalty",
            GateRule::ParpRescue           => "parp_rescue",
            GateRule::IoBoost              => "io_boost",
            GateRule::IoInsufficientSignal => "io_insufficient_signal",
            GateRule::CompletenessCap      => "completeness_cap",
        }
    }
}

/// One audited adjustment. `before == after` marks a note-only record
/// (a rule that evaluated but withheld action).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentRecord {
    pub rule: GateRule,
    pub reason: String,
    pub before: f64,
    pub after: f64,
}

/// Gate application result: adjusted score, capped confidence, and
/// the ordered adjustment log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateOutcome {
    pub score: f64,
    pub confidence: f64,
    pub records: Vec<AdjustmentRecord>,
}

/// Apply the sporadic gates in fixed rule order.
pub fn apply(
    base_score: f64,
    base_confidence: f64,
    drug: &DrugCandidate,
    germline: GermlineStatus,
    context: &TumorContext,
    config: &GateConfig,
) -> GateOutcome {
    let mut score = base_score;
    let mut confidence = base_confidence;
    let mut records = Vec::new();

    // Rule 1: PARP-class penalty with HRD rescue.
    if config.enable_parp_gate
        && drug.moa_class.requires_hrd()
        && germline == GermlineStatus::Negative
    {
        match context.hrd_score {
            Some(hrd) if hrd >= config.hrd_rescue_threshold => {
                records.push(AdjustmentRecord {
                    rule: GateRule::ParpRescue,
                    reason: format!(
                        "germline-negative but tumor HRD {hrd:.1} >= {:.1}: penalty waived",
                        config.hrd_rescue_threshold
                    ),
                    before: score,
                    after: score,
                });
            }
            _ => {
                let before = score;
                score *= config.parp_penalty_factor;
                let detail = match context.hrd_score {
                    Some(hrd) => format!(
                        "tumor HRD {hrd:.1} below {:.1}",
                        config.hrd_rescue_threshold
                    ),
                    None => "tumor HRD unknown".to_string(),
                };
                records.push(AdjustmentRecord {
                    rule: GateRule::ParpPenalty,
                    reason: format!(
                        "germline-negative and {detail}: x{:.2} penalty",
                        config.parp_penalty_factor
                    ),
                    before,
                    after: score,
                });
            }
        }
    }

    // Rule 2: immunotherapy boost on TMB-high or MSI-high.
    if config.enable_io_gate && drug.moa_class.is_immune_checkpoint() {
        let tmb_high = context.tmb.map(|t| t >= config.tmb_boost_threshold);
        let msi_high = context.msi.map(|m| m == MsiStatus::High);

        match (tmb_high, msi_high) {
            (Some(true), _) | (_, Some(true)) => {
                let before = score;
                score = (score * config.io_boost_factor).min(1.0);
                let trigger = if tmb_high == Some(true) {
                    format!("TMB {:.1} >= {:.1}", context.tmb.unwrap_or(0.0), config.tmb_boost_threshold)
                } else {
                    "MSI-high".to_string()
                };
                records.push(AdjustmentRecord {
                    rule: GateRule::IoBoost,
                    reason: format!("{trigger}: x{:.2} boost", config.io_boost_factor),
                    before,
                    after: score,
                });
            }
            (None, None) => {
                // Unknown biomarkers never default to boosted or penalized.
                records.push(AdjustmentRecord {
                    rule: GateRule::IoInsufficientSignal,
                    reason: "TMB and MSI unknown: no boost applied".to_string(),
                    before: score,
                    after: score,
                });
            }
            _ => {} // measured but below threshold: no action, no note
        }
    }

    // Rule 3: completeness-based confidence cap.
    if config.enable_completeness_cap {
        let present = context.biomarkers_present();
        let cap = match present {
            0 => Some(config.completeness_cap_zero),
            1 => Some(config.completeness_cap_one),
            _ => None,
        };
        if let Some(cap) = cap {
            if confidence > cap {
                let before = confidence;
                confidence = cap;
                records.push(AdjustmentRecord {
                    rule: GateRule::CompletenessCap,
                    reason: format!(
                        "{present} of 3 biomarkers present: confidence capped at {cap:.2}"
                    ),
                    before,
                    after: confidence,
                });
            }
        }
    }

    debug!(
        drug = %drug.name,
        base_score,
        adjusted_score = score,
        n_adjustments = records.len(),
        "sporadic gates applied"
    );

    GateOutcome { score, confidence, records }
}

// ── Tests ───────────────────────────────────────────────────────────────────
