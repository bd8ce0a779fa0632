//! Pathway aggregation.
//!
//! Pure, stateless reduction from per-variant disruption to
//! per-pathway scores, and from pathway scores to a per-drug
//! alignment. Pathways with no contributing variants are absent from
//! the result — callers distinguish "no signal" from "measured zero".

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use oncosel_common::entities::DrugCandidate;
use oncosel_seqscore::SequenceScore;

/// Aggregated disruption for one pathway.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathwayScore {
    /// Weighted mean of contributing variants' normalized disruption.
    pub score: f64,
    pub n_variants: usize,
}

/// Gene → pathway memberships with relevance weights. Static curated
/// table; an unknown gene simply contributes to no pathway.
pub fn gene_pathways(gene: &str) -> &'static [(&'static str, f64)] {
    match gene.to_uppercase().as_str() {
        "BRCA1" | "BRCA2" | "PALB2" | "RAD51C" | "RAD51D" => &[("ddr", 1.0)],
        "ATM" | "ATR" | "CHEK2"     => &[("ddr", 0.8), ("cell_cycle", 0.3)],
        "TP53"                      => &[("ddr", 0.5), ("cell_cycle", 0.8)],
        "KRAS" | "NRAS" | "BRAF"    => &[("rtk_ras", 1.0)],
        "EGFR" | "ERBB2" | "MET"    => &[("rtk_ras", 1.0), ("pi3k_akt", 0.3)],
        "PIK3CA" | "PTEN" | "AKT1"  => &[("pi3k_akt", 1.0)],
        "CDK4" | "CDK6" | "CCND1" | "RB1" | "CDKN2A" => &[("cell_cycle", 1.0)],
        "MLH1" | "MSH2" | "MSH6" | "PMS2" => &[("mmr", 1.0), ("immune_evasion", 0.6)],
        "POLE" | "POLD1"            => &[("immune_evasion", 0.8), ("ddr", 0.4)],
        "VEGFA" | "KDR"             => &[("angiogenesis", 1.0)],
        "JAK1" | "JAK2" | "B2M"     => &[("immune_evasion", 1.0)],
        _ => &[],
    }
}

/// Aggregate variant scores into per-pathway scores.
///
/// For every (variant, pathway) membership, `disruption × weight`
/// accumulates into a running total with a count; the final value is
/// `total / count`. Degraded scores still contribute (zero magnitude,
/// counted) — a degraded variant is low-confidence, not absent.
pub fn aggregate(scores: &[(String, SequenceScore)]) -> HashMap<String, PathwayScore> {
    let mut totals: HashMap<&'static str, (f64, usize)> = HashMap::new();

    for (gene, score) in scores {
        for (pathway, weight) in gene_pathways(gene) {
            let entry = totals.entry(pathway).or_insert((0.0, 0));
            entry.0 += score.normalized * weight;
            entry.1 += 1;
        }
    }

    totals
        .into_iter()
        .map(|(pathway, (total, count))| {
            (
                pathway.to_string(),
                PathwayScore { score: total / count as f64, n_variants: count },
            )
        })
        .collect()
}

/// Per-drug pathway alignment: weighted mean of the drug's relevant
/// pathway scores, weights from the panel. Pathways absent from the
/// aggregation contribute nothing (neither signal nor denominator).
pub fn drug_pathway_score(
    drug: &DrugCandidate,
    pathways: &HashMap<String, PathwayScore>,
) -> f64 {
    let mut weighted = 0.0;
    let mut weight_sum = 0.0;
    for (pathway, weight) in &drug.pathway_weights {
        if let Some(ps) = pathways.get(pathway) {
            weighted += ps.score * weight;
            weight_sum += weight;
        }
    }
    if weight_sum > 0.0 {
        weighted / weight_sum
    } else {
        0.0
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
