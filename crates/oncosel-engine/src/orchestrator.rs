//! Efficacy orchestrator.
//!
//! Composes the sequence scorer, pathway aggregator, evidence and
//! insights clients, confidence engine, and sporadic gates per drug
//! candidate, producing the ranked response with full provenance.
//! Per-signal failures degrade that drug's contribution; only a
//! structurally invalid top-level request is rejected.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use oncosel_common::config::{ConfidenceConfig, DrugPanel, GateConfig};
use oncosel_common::entities::{
    Badge, ConsequenceClass, DrugCandidate, GenomicCoords, GermlineStatus, Tier, TumorContext,
    Variant,
};
use oncosel_common::error::{OncoselError, Result};
use oncosel_evidence::clinvar::{clinvar_prior, ClinvarPrior, CuratedVariantDb, CLINVAR_TIMEOUT};
use oncosel_evidence::insights::{InsightNote, InsightsBundle, InsightsClient};
use oncosel_evidence::literature::{EvidenceHit, LiteratureScorer};
use oncosel_seqscore::{SequenceScore, SequenceScorer};

use crate::confidence::{self, FusionWeights};
use crate::gates::{self, AdjustmentRecord};
use crate::pathway::{self, PathwayScore};

/// Default global budget for the per-request evidence fan-out.
pub const DEFAULT_REQUEST_BUDGET: Duration = Duration::from_secs(30);

// ── Request types ───────────────────────────────────────────────────────────

/// Unvalidated variant as received from the caller. Construction into
/// a [`Variant`] happens inside `predict`, so one malformed variant
/// never aborts scoring of the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantInput {
    pub gene: String,
    #[serde(default)]
    pub hgvs_p: Option<String>,
    #[serde(default)]
    pub hgvs_c: Option<String>,
    #[serde(default)]
    pub coords: Option<GenomicCoords>,
    #[serde(default = "default_consequence")]
    pub consequence: ConsequenceClass,
}

fn default_consequence() -> ConsequenceClass {
    ConsequenceClass::Other
}

impl VariantInput {
    fn build(&self) -> Result<Variant> {
        Variant::new(
            self.gene.clone(),
            self.hgvs_p.clone(),
            self.hgvs_c.clone(),
            self.coords.clone(),
            self.consequence,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictOptions {
    #[serde(default)]
    pub engine_hint: Option<String>,
    /// When false, insufficient-tier drugs are dropped from the
    /// response.
    #[serde(default = "default_true")]
    pub include_all_drugs: bool,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self { engine_hint: None, include_all_drugs: true }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub mutations: Vec<VariantInput>,
    pub germline_status: GermlineStatus,
    #[serde(default)]
    pub tumor_context: Option<TumorContext>,
    pub disease: String,
    #[serde(default)]
    pub options: PredictOptions,
}

// ── Response types ──────────────────────────────────────────────────────────

/// The three fused signal components behind a drug's score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RationaleBreakdown {
    pub seq_component: f64,
    pub pathway_component: f64,
    pub evidence_strength: f64,
    pub clinvar_adjustment: f64,
}

/// Audit trail: enough to reconstruct why a score was produced
/// without re-running external calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub request_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub literature_query: String,
    pub literature_failed: bool,
    pub clinvar_failed: bool,
    pub evidence_budget_exhausted: bool,
    pub anchor_variant: Option<String>,
    pub insights_notes: Vec<InsightNote>,
    /// Variant identities served from the sequence-score cache.
    pub cache_hits: Vec<String>,
    /// Variants whose scoring degraded to a zero placeholder.
    pub degraded_variants: Vec<String>,
    /// Inputs dropped as structurally invalid, with reasons.
    pub dropped_variants: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EfficacyResult {
    pub drug: String,
    pub moa: String,
    pub score: f64,
    pub tier: Tier,
    pub confidence: f64,
    pub badges: Vec<Badge>,
    pub rationale: RationaleBreakdown,
    pub adjustments: Vec<AdjustmentRecord>,
    pub provenance: Provenance,
}

// ── Engine ──────────────────────────────────────────────────────────────────

pub struct EfficacyEngine {
    scorer: SequenceScorer,
    literature: LiteratureScorer,
    variant_db: Arc<dyn CuratedVariantDb>,
    insights: InsightsClient,
    panel: DrugPanel,
    confidence_config: ConfidenceConfig,
    gate_config: GateConfig,
    fusion_weights: FusionWeights,
    request_budget: Duration,
}

impl EfficacyEngine {
    /// Configuration is validated here, at startup — malformed panels
    /// or thresholds never surface at request time.
    pub fn new(
        scorer: SequenceScorer,
        literature: LiteratureScorer,
        variant_db: Arc<dyn CuratedVariantDb>,
        insights: InsightsClient,
        panel: DrugPanel,
        confidence_config: ConfidenceConfig,
        gate_config: GateConfig,
    ) -> Result<Self> {
        panel.validate()?;
        confidence_config.validate()?;
        gate_config.validate()?;
        let fusion_weights = FusionWeights::default();
        if !fusion_weights.validate() {
            return Err(OncoselError::Config("fusion weights do not sum to 1.0".into()));
        }
        Ok(Self {
            scorer,
            literature,
            variant_db,
            insights,
            panel,
            confidence_config,
            gate_config,
            fusion_weights,
            request_budget: DEFAULT_REQUEST_BUDGET,
        })
    }

    pub fn with_request_budget(mut self, budget: Duration) -> Self {
        self.request_budget = budget;
        self
    }

    /// Score every panel drug for this patient. Always returns a
    /// ranked list (possibly all insufficient); only a structurally
    /// invalid request errors.
    #[instrument(skip(self, request), fields(disease = %request.disease))]
    pub async fn predict(&self, request: &PredictionRequest) -> Result<Vec<EfficacyResult>> {
        if request.mutations.is_empty() && request.tumor_context.is_none() {
            return Err(OncoselError::InvalidRequest(
                "empty variant list with no tumor context".into(),
            ));
        }

        let request_id = Uuid::new_v4();
        let tumor_context = request.tumor_context.clone().unwrap_or_default();

        // Build variants, dropping invalid ones with a recorded reason.
        let mut variants = Vec::new();
        let mut dropped = Vec::new();
        for input in &request.mutations {
            match input.build() {
                Ok(v) => variants.push(v),
                Err(e) => {
                    warn!(gene = %input.gene, error = %e, "dropping invalid variant");
                    dropped.push(e.to_string());
                }
            }
        }

        // Stage 1: score all variants once, shared across drugs.
        let hint = request.options.engine_hint.as_deref();
        let scores: Vec<SequenceScore> =
            join_all(variants.iter().map(|v| self.scorer.score(v, hint))).await;

        let cache_hits: Vec<String> = scores
            .iter()
            .filter(|s| s.cache_hit)
            .map(|s| s.variant.clone())
            .collect();
        let degraded: Vec<String> = scores
            .iter()
            .filter(|s| s.degraded)
            .map(|s| s.variant.clone())
            .collect();

        // Stage 2: pathway aggregation (pure; all scores available).
        let gene_scores: Vec<(String, SequenceScore)> = variants
            .iter()
            .zip(scores.iter())
            .map(|(v, s)| (v.gene.clone(), s.clone()))
            .collect();
        let pathways = pathway::aggregate(&gene_scores);

        let seq_norm_max = scores.iter().map(|s| s.normalized).fold(0.0, f64::max);
        let seq_pct_max = scores.iter().map(|s| s.percentile).fold(0.0, f64::max);

        // Stage 3: insights per variant, concurrently.
        let bundles: Vec<InsightsBundle> =
            join_all(variants.iter().map(|v| self.insights.bundle(v))).await;
        let bundle_by_variant: HashMap<String, &InsightsBundle> = variants
            .iter()
            .zip(bundles.iter())
            .map(|(v, b)| (v.identity(), b))
            .collect();

        // Stage 4: evidence fan-out per drug, bounded by the global
        // request budget. Budget exhaustion degrades evidence for all
        // drugs rather than failing the request.
        let evidence_futs = self.panel.drugs.iter().map(|drug| {
            let anchor = anchor_variant(drug, &variants, &scores);
            self.drug_evidence(drug, anchor, &request.disease)
        });
        let (evidence, budget_exhausted) =
            match tokio::time::timeout(self.request_budget, join_all(evidence_futs)).await {
                Ok(ev) => (ev, false),
                Err(_) => {
                    warn!(budget = ?self.request_budget, "request evidence budget exhausted");
                    let ev = self
                        .panel
                        .drugs
                        .iter()
                        .map(|drug| {
                            let anchor = anchor_variant(drug, &variants, &scores);
                            (degraded_evidence(), ClinvarPrior::absent(), anchor.map(|v| v.identity()))
                        })
                        .collect();
                    (ev, true)
                }
            };

        // Stage 5: fuse, classify, gate, and assemble per drug.
        let mut results = Vec::with_capacity(self.panel.drugs.len());
        for (drug, (hit, prior, anchor_id)) in self.panel.drugs.iter().zip(evidence) {
            let drug_pathway = pathway::drug_pathway_score(drug, &pathways);
            let evidence_score = (hit.strength + prior.adjustment).clamp(0.0, 1.0);

            let badges = confidence::derive_badges(&hit, &prior, drug_pathway);
            let tier = confidence::tier(
                seq_norm_max,
                drug_pathway,
                evidence_score,
                &badges,
                &self.confidence_config,
            );

            let bundle = anchor_id
                .as_ref()
                .and_then(|id| bundle_by_variant.get(id).copied())
                .cloned()
                .unwrap_or_default();
            let base_confidence = confidence::confidence(
                tier,
                seq_pct_max,
                drug_pathway,
                &bundle,
                &self.confidence_config,
            );

            let base_score = confidence::fuse_score(
                seq_norm_max,
                drug_pathway,
                hit.strength,
                prior.adjustment,
                &self.fusion_weights,
            );

            let outcome = gates::apply(
                base_score,
                base_confidence,
                drug,
                request.germline_status,
                &tumor_context,
                &self.gate_config,
            );

            results.push(EfficacyResult {
                drug: drug.name.clone(),
                moa: drug.moa.clone(),
                score: outcome.score,
                tier,
                confidence: outcome.confidence,
                badges,
                rationale: RationaleBreakdown {
                    seq_component: seq_norm_max,
                    pathway_component: drug_pathway,
                    evidence_strength: hit.strength,
                    clinvar_adjustment: prior.adjustment,
                },
                adjustments: outcome.records,
                provenance: Provenance {
                    request_id,
                    generated_at: Utc::now(),
                    literature_query: hit.query.clone(),
                    literature_failed: hit.failed,
                    clinvar_failed: prior.failed,
                    evidence_budget_exhausted: budget_exhausted,
                    anchor_variant: anchor_id,
                    insights_notes: bundle.notes.clone(),
                    cache_hits: cache_hits.clone(),
                    degraded_variants: degraded.clone(),
                    dropped_variants: dropped.clone(),
                },
            });
        }

        rank(&mut results);
        if !request.options.include_all_drugs {
            results.retain(|r| r.tier != Tier::Insufficient);
        }

        info!(
            %request_id,
            n_variants = variants.len(),
            n_dropped = dropped.len(),
            n_results = results.len(),
            "efficacy prediction complete"
        );
        Ok(results)
    }

    async fn drug_evidence(
        &self,
        drug: &DrugCandidate,
        anchor: Option<&Variant>,
        disease: &str,
    ) -> (EvidenceHit, ClinvarPrior, Option<String>) {
        let Some(variant) = anchor else {
            // No scoreable variant: evidence absent, not failed.
            return (degraded_evidence(), ClinvarPrior::absent(), None);
        };

        let (hit, prior) = tokio::join!(
            self.literature.literature(
                &variant.gene,
                variant.hgvs_p.as_deref(),
                &drug.name,
                &drug.moa,
                drug.moa_class,
                disease,
            ),
            clinvar_prior(
                &self.variant_db,
                &variant.gene,
                variant.coords.as_ref(),
                CLINVAR_TIMEOUT,
            ),
        );
        (hit, prior, Some(variant.identity()))
    }
}

/// The variant anchoring a drug's evidence queries: the most
/// disruptive variant in a gene relevant to the drug's pathways,
/// falling back to the most disruptive overall.
fn anchor_variant<'a>(
    drug: &DrugCandidate,
    variants: &'a [Variant],
    scores: &[SequenceScore],
) -> Option<&'a Variant> {
    let relevant = |v: &Variant| {
        pathway::gene_pathways(&v.gene)
            .iter()
            .any(|(p, _)| drug.pathway_weights.contains_key(*p))
    };

    let best = |filter: &dyn Fn(&Variant) -> bool| {
        variants
            .iter()
            .zip(scores.iter())
            .filter(|(v, _)| filter(v))
            .max_by(|(_, a), (_, b)| {
                a.normalized
                    .partial_cmp(&b.normalized)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(v, _)| v)
    };

    best(&relevant).or_else(|| best(&|_| true))
}

fn degraded_evidence() -> EvidenceHit {
    EvidenceHit {
        strength: 0.0,
        moa_term_hits: 0,
        raw_docs: vec![],
        mechanism_docs: vec![],
        query: String::new(),
        failed: false,
    }
}

/// Deterministic ranking: score descending, ties by tier rank then
/// drug name.
fn rank(results: &mut [EfficacyResult]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.tier.rank().cmp(&a.tier.rank()))
            .then(a.drug.cmp(&b.drug))
    });
}

// ── Tests ───────────────────────────────────────────────────────────────────
