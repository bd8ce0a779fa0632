//! Confidence engine: badge derivation, tier classification, and the
//! tier-specific confidence formulas with insights lifts.

use serde::{Deserialize, Serialize};

use oncosel_common::config::ConfidenceConfig;
use oncosel_common::entities::{Badge, Tier};
use oncosel_evidence::clinvar::ClinvarPrior;
use oncosel_evidence::insights::InsightsBundle;
use oncosel_evidence::literature::EvidenceHit;

// ── Score fusion ────────────────────────────────────────────────────────────

/// Weights of the three fused signals in the base efficacy score.
/// Sum to 1.0; the curated-variant prior is added afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionWeights {
    pub sequence: f64,
    pub pathway: f64,
    pub evidence: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self { sequence: 0.4, pathway: 0.3, evidence: 0.3 }
    }
}

impl FusionWeights {
    pub fn validate(&self) -> bool {
        let sum = self.sequence + self.pathway + self.evidence;
        (sum - 1.0).abs() < 1e-6
    }
}

/// Base efficacy score: weighted sum of the three signals plus the
/// signed ClinVar prior, clamped to [0, 1].
pub fn fuse_score(
    seq_score: f64,
    pathway_score: f64,
    evidence_score: f64,
    prior_adjustment: f64,
    weights: &FusionWeights,
) -> f64 {
    let fused = weights.sequence * seq_score
        + weights.pathway * pathway_score
        + weights.evidence * evidence_score
        + prior_adjustment;
    fused.clamp(0.0, 1.0)
}

// ── Badges ──────────────────────────────────────────────────────────────────

/// Derive quality badges from the auxiliary signals.
pub fn derive_badges(
    evidence: &EvidenceHit,
    prior: &ClinvarPrior,
    pathway_score: f64,
) -> Vec<Badge> {
    let mut badges = Vec::new();

    if evidence.strength >= 0.7 {
        badges.push(Badge::StrongLiterature);
    } else if evidence.strength >= 0.4 {
        badges.push(Badge::ModerateLiterature);
    }

    let has_pub_type = |needle: &str| {
        evidence.raw_docs.iter().any(|d| {
            d.pub_types.iter().any(|t| t.to_lowercase().contains(needle))
        })
    };
    if has_pub_type("randomized controlled trial") {
        badges.push(Badge::Rct);
    }
    if has_pub_type("guideline") {
        badges.push(Badge::Guideline);
    }

    if let Some(record) = &prior.record {
        let direction = record.classification.direction();
        if direction > 0.0 {
            if record.review_status.is_strong() {
                badges.push(Badge::ClinvarStrong);
            } else if record.review_status.strength() >= 0.5 {
                badges.push(Badge::ClinvarModerate);
            }
        } else if direction < 0.0 {
            badges.push(Badge::ClinvarBenign);
        }
    }

    if pathway_score >= 0.2 {
        badges.push(Badge::PathwayAligned);
    }

    badges
}

// ── Tier ────────────────────────────────────────────────────────────────────

/// Classify a drug's evidence tier from the three fused signals plus
/// badges.
pub fn tier(
    seq_score: f64,
    pathway_score: f64,
    evidence_score: f64,
    badges: &[Badge],
    config: &ConfidenceConfig,
) -> Tier {
    let clinvar_strong = badges.contains(&Badge::ClinvarStrong);

    if evidence_score >= config.evidence_gate
        || (clinvar_strong && pathway_score >= config.pathway_alignment)
    {
        return Tier::Supported;
    }

    if seq_score < config.insufficient_signal && pathway_score < 0.05 && evidence_score < 0.2 {
        return Tier::Insufficient;
    }

    Tier::Consider
}

// ── Confidence ──────────────────────────────────────────────────────────────

/// Numeric confidence by tier-specific formula, plus additive
/// insights lifts, clamped to [0, 1].
pub fn confidence(
    tier: Tier,
    seq_percentile: f64,
    pathway_percentile: f64,
    insights: &InsightsBundle,
    config: &ConfidenceConfig,
) -> f64 {
    let base = match tier {
        Tier::Supported => 0.6 + 0.2 * seq_percentile.max(pathway_percentile),
        Tier::Consider => 0.3 + 0.1 * seq_percentile + 0.1 * pathway_percentile,
        Tier::Insufficient => {
            if config.fusion_engine_active {
                // Partial-credit mode: deliberately lower-capped.
                0.1 + 0.15 * seq_percentile + 0.10 * pathway_percentile
            } else {
                0.0
            }
        }
    };

    (base + insight_lifts(insights)).clamp(0.0, 1.0)
}

/// Independent additive lifts from the insights bundle.
pub fn insight_lifts(insights: &InsightsBundle) -> f64 {
    let mut lift = 0.0;
    if insights.functionality.is_some_and(|v| v >= 0.6) {
        lift += 0.05;
    }
    if insights.chromatin.is_some_and(|v| v >= 0.5) {
        lift += 0.03;
    }
    if insights.essentiality.is_some_and(|v| v >= 0.7) {
        lift += 0.07;
    }
    if insights.regulatory.is_some_and(|v| v >= 0.6) {
        lift += 0.02;
    }
    lift
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use oncosel_evidence::clinvar::{ClinvarClassification, ClinvarRecord, ReviewStatus};
    use oncosel_evidence::literature::LiteratureDoc;

    fn hit(strength: f64, pub_types: &[&str]) -> EvidenceHit {
        EvidenceHit {
            strength,
            moa_term_hits: 0,
            raw_docs: vec![LiteratureDoc {
                id: "1".into(),
                title: "t".into(),
                pub_types: pub_types.iter().map(|s| s.to_string()).collect(),
            }],
            mechanism_docs: vec![],
            query: "q".into(),
            failed: false,
        }
    }

    fn strong_pathogenic() -> ClinvarPrior {
        ClinvarPrior::from_record(ClinvarRecord {
            classification: ClinvarClassification::Pathogenic,
            review_status: ReviewStatus::ExpertPanel,
        })
    }

    #[test]
    fn test_fusion_weights_default_valid() {
        assert!(FusionWeights::default().validate());
    }

    #[test]
    fn test_fuse_score_clamped() {
        let w = FusionWeights::default();
        assert_eq!(fuse_score(1.0, 1.0, 1.0, 0.2, &w), 1.0);
        assert_eq!(fuse_score(0.0, 0.0, 0.0, -0.2, &w), 0.0);
    }

    #[test]
    fn test_supported_by_evidence_gate() {
        let cfg = ConfidenceConfig::default();
        assert_eq!(tier(0.5, 0.1, 0.7, &[], &cfg), Tier::Supported);
        assert_eq!(tier(0.5, 0.1, 0.69, &[], &cfg), Tier::Consider);
    }

    #[test]
    fn test_supported_by_clinvar_plus_pathway() {
        let cfg = ConfidenceConfig::default();
        let badges = [Badge::ClinvarStrong];
        assert_eq!(tier(0.5, 0.25, 0.1, &badges, &cfg), Tier::Supported);
        // Pathway below alignment threshold: badge alone not enough.
        assert_eq!(tier(0.5, 0.1, 0.1, &badges, &cfg), Tier::Consider);
    }

    #[test]
    fn test_insufficient_requires_all_three_weak() {
        let cfg = ConfidenceConfig::default();
        assert_eq!(tier(0.01, 0.01, 0.1, &[], &cfg), Tier::Insufficient);
        // One strong signal rescues to consider.
        assert_eq!(tier(0.5, 0.01, 0.1, &[], &cfg), Tier::Consider);
    }

    #[test]
    fn test_tier_monotone_in_evidence() {
        let cfg = ConfidenceConfig::default();
        let mut last_rank = 0;
        for e in [0.0, 0.1, 0.3, 0.5, 0.7, 0.9] {
            let rank = tier(0.01, 0.01, e, &[], &cfg).rank();
            assert!(rank >= last_rank, "tier rank decreased at evidence {e}");
            last_rank = rank;
        }
    }

    #[test]
    fn test_confidence_formulas() {
        let cfg = ConfidenceConfig::default();
        let none = InsightsBundle::default();
        let c = confidence(Tier::Supported, 0.9, 0.5, &none, &cfg);
        assert!((c - (0.6 + 0.2 * 0.9)).abs() < 1e-9);

        let c = confidence(Tier::Consider, 0.4, 0.6, &none, &cfg);
        assert!((c - (0.3 + 0.04 + 0.06)).abs() < 1e-9);

        assert_eq!(confidence(Tier::Insufficient, 0.9, 0.9, &none, &cfg), 0.0);
    }

    #[test]
    fn test_fusion_active_partial_credit() {
        let cfg = ConfidenceConfig { fusion_engine_active: true, ..Default::default() };
        let none = InsightsBundle::default();
        let c = confidence(Tier::Insufficient, 0.8, 0.4, &none, &cfg);
        assert!((c - (0.1 + 0.12 + 0.04)).abs() < 1e-9);
        // Stays below the consider floor for strong percentiles.
        assert!(confidence(Tier::Insufficient, 1.0, 1.0, &none, &cfg) < 0.4);
    }

    #[test]
    fn test_insight_lifts_additive_and_thresholded() {
        let full = InsightsBundle {
            functionality: Some(0.6),
            chromatin: Some(0.5),
            essentiality: Some(0.7),
            regulatory: Some(0.6),
            notes: vec![],
        };
        assert!((insight_lifts(&full) - 0.17).abs() < 1e-9);

        let below = InsightsBundle {
            functionality: Some(0.59),
            chromatin: Some(0.49),
            essentiality: Some(0.69),
            regulatory: Some(0.59),
            notes: vec![],
        };
        assert_eq!(insight_lifts(&below), 0.0);
    }

    #[test]
    fn test_confidence_clamped_under_lift_stacking() {
        let cfg = ConfidenceConfig::default();
        let full = InsightsBundle {
            functionality: Some(1.0),
            chromatin: Some(1.0),
            essentiality: Some(1.0),
            regulatory: Some(1.0),
            notes: vec![],
        };
        let c = confidence(Tier::Supported, 1.0, 1.0, &full, &cfg);
        assert_eq!(c, 1.0);
    }

    #[test]
    fn test_badges() {
        let badges = derive_badges(
            &hit(0.75, &["Randomized Controlled Trial"]),
            &strong_pathogenic(),
            0.3,
        );
        assert!(badges.contains(&Badge::StrongLiterature));
        assert!(badges.contains(&Badge::Rct));
        assert!(badges.contains(&Badge::ClinvarStrong));
        assert!(badges.contains(&Badge::PathwayAligned));
    }

    #[test]
    fn test_benign_badge() {
        let prior = ClinvarPrior::from_record(ClinvarRecord {
            classification: ClinvarClassification::Benign,
            review_status: ReviewStatus::ExpertPanel,
        });
        let badges = derive_badges(&hit(0.1, &[]), &prior, 0.0);
        assert!(badges.contains(&Badge::ClinvarBenign));
        assert!(!badges.contains(&Badge::PathwayAligned));
    }

    #[test]
    fn test_determinism() {
        let cfg = ConfidenceConfig::default();
        let bundle = InsightsBundle { functionality: Some(0.9), ..Default::default() };
        let a = confidence(Tier::Consider, 0.33, 0.44, &bundle, &cfg);
        let b = confidence(Tier::Consider, 0.33, 0.44, &bundle, &cfg);
        assert_eq!(a.to_bits(), b.to_bits());
    }
}
