//! End-to-end prediction scenarios with mocked collaborators.

use std::sync::Arc;
use std::time::Duration;

use oncosel_common::config::{ConfidenceConfig, DrugPanel, GateConfig};
use oncosel_common::entities::{
    Badge, ConsequenceClass, GenomicCoords, GermlineStatus, MsiStatus, Tier, TumorContext,
};
use oncosel_common::error::OncoselError;
use oncosel_engine::gates::GateRule;
use oncosel_engine::{EfficacyEngine, EfficacyResult, PredictOptions, PredictionRequest, VariantInput};
use oncosel_evidence::clinvar::{
    ClinvarClassification, ClinvarRecord, CuratedVariantDb, MockVariantDb, ReviewStatus,
};
use oncosel_evidence::insights::{InsightEndpoint, InsightsClient, MockInsightsProvider};
use oncosel_evidence::literature::{LiteratureDoc, LiteratureScorer, MockLiteratureIndex};
use oncosel_seqscore::engine::MockEngine;
use oncosel_seqscore::{EngineScore, ScoreCache, ScoringEngine, SequenceScorer};

// ── Fixtures ────────────────────────────────────────────────────────────────

fn doc(title: &str, pub_type: &str) -> LiteratureDoc {
    LiteratureDoc {
        id: "1".into(),
        title: title.into(),
        pub_types: vec![pub_type.into()],
    }
}

fn build_engine(index: MockLiteratureIndex, db: MockVariantDb) -> EfficacyEngine {
    scoring_engine(index, db, MockEngine::succeeding("scripted", 3.0, 0.9))
}

fn scoring_engine(
    index: MockLiteratureIndex,
    db: MockVariantDb,
    engine: MockEngine,
) -> EfficacyEngine {
    let cache = Arc::new(ScoreCache::new(Duration::from_secs(600)));
    let scorer = SequenceScorer::new(cache).with_engine(Arc::new(engine));
    let insights = InsightsClient::new(Arc::new(
        MockInsightsProvider::new()
            .with(InsightEndpoint::Functionality, 0.8)
            .with(InsightEndpoint::Chromatin, 0.6)
            .with(InsightEndpoint::Essentiality, 0.9)
            .with(InsightEndpoint::Regulatory, 0.7),
    ));
    EfficacyEngine::new(
        scorer,
        LiteratureScorer::new(Arc::new(index)),
        Arc::new(db) as Arc<dyn CuratedVariantDb>,
        insights,
        DrugPanel::builtin(),
        ConfidenceConfig::default(),
        GateConfig::default(),
    )
    .expect("builtin configuration must validate")
}

fn brca1_frameshift() -> VariantInput {
    VariantInput {
        gene: "BRCA1".into(),
        hgvs_p: Some("p.Gln1756fs".into()),
        hgvs_c: None,
        coords: Some(GenomicCoords {
            chromosome: "17".into(),
            position: 43045705,
            reference: "G".into(),
            alternate: "A".into(),
        }),
        consequence: ConsequenceClass::Frameshift,
    }
}

fn request(
    germline: GermlineStatus,
    context: Option<TumorContext>,
) -> PredictionRequest {
    PredictionRequest {
        mutations: vec![brca1_frameshift()],
        germline_status: germline,
        tumor_context: context,
        disease: "ovarian cancer".into(),
        options: PredictOptions::default(),
    }
}

fn full_context(hrd: f64, tmb: f64) -> TumorContext {
    TumorContext {
        tmb: Some(tmb),
        msi: Some(MsiStatus::Stable),
        hrd_score: Some(hrd),
    }
}

fn drug<'a>(results: &'a [EfficacyResult], name: &str) -> &'a EfficacyResult {
    results
        .iter()
        .find(|r| r.drug == name)
        .unwrap_or_else(|| panic!("{name} missing from results"))
}

// ── PARP gate ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn hrd_high_sporadic_tumor_rescues_parp_drugs() {
    let engine = build_engine(MockLiteratureIndex::failing(), MockVariantDb::new());

    let rescued = engine
        .predict(&request(GermlineStatus::Negative, Some(full_context(55.0, 4.0))))
        .await
        .unwrap();
    let penalized = engine
        .predict(&request(GermlineStatus::Negative, Some(full_context(20.0, 4.0))))
        .await
        .unwrap();

    let olaparib_rescued = drug(&rescued, "Olaparib");
    let olaparib_penalized = drug(&penalized, "Olaparib");

    assert!(olaparib_rescued
        .adjustments
        .iter()
        .any(|a| a.rule == GateRule::ParpRescue));
    assert!(olaparib_penalized
        .adjustments
        .iter()
        .any(|a| a.rule == GateRule::ParpPenalty));
    assert!(olaparib_rescued.score > olaparib_penalized.score);
    // A rescued PARP candidate on a disrupted DDR gene is a real
    // recommendation, never insufficient.
    assert_ne!(olaparib_rescued.tier, Tier::Insufficient);
}

#[tokio::test]
async fn germline_positive_skips_parp_penalty() {
    let engine = build_engine(MockLiteratureIndex::failing(), MockVariantDb::new());
    let results = engine
        .predict(&request(GermlineStatus::Positive, Some(full_context(20.0, 4.0))))
        .await
        .unwrap();

    let olaparib = drug(&results, "Olaparib");
    assert!(olaparib.adjustments.iter().all(|a| a.rule != GateRule::ParpPenalty));
}

// ── IO gate ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn tmb_high_boosts_immunotherapy() {
    let engine = build_engine(MockLiteratureIndex::failing(), MockVariantDb::new());

    let boosted = engine
        .predict(&request(GermlineStatus::Unknown, Some(full_context(55.0, 16.0))))
        .await
        .unwrap();
    let flat = engine
        .predict(&request(GermlineStatus::Unknown, Some(full_context(55.0, 4.0))))
        .await
        .unwrap();

    let pembro_boosted = drug(&boosted, "Pembrolizumab");
    let pembro_flat = drug(&flat, "Pembrolizumab");

    assert!(pembro_boosted.adjustments.iter().any(|a| a.rule == GateRule::IoBoost));
    assert!(pembro_boosted.score > pembro_flat.score);

    // Germline unknown: the PARP gate must not fire in either
    // direction, and the IO boost never leaks onto non-IO drugs.
    let olaparib = drug(&boosted, "Olaparib");
    assert!(olaparib.adjustments.iter().all(|a| {
        a.rule != GateRule::ParpPenalty
            && a.rule != GateRule::ParpRescue
            && a.rule != GateRule::IoBoost
    }));
}

#[tokio::test]
async fn unknown_tmb_and_msi_leaves_io_note() {
    let engine = build_engine(MockLiteratureIndex::failing(), MockVariantDb::new());
    let context = TumorContext { tmb: None, msi: None, hrd_score: Some(55.0) };
    let results = engine
        .predict(&request(GermlineStatus::Unknown, Some(context)))
        .await
        .unwrap();

    let pembro = drug(&results, "Pembrolizumab");
    assert!(pembro
        .adjustments
        .iter()
        .any(|a| a.rule == GateRule::IoInsufficientSignal));
    assert!(pembro.adjustments.iter().all(|a| a.rule != GateRule::IoBoost));
}

// ── Completeness cap ────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_biomarkers_cap_confidence() {
    let engine = build_engine(
        MockLiteratureIndex::with_docs(vec![doc(
            "olaparib parp inhibitor maintenance",
            "Randomized Controlled Trial",
        )]),
        MockVariantDb::new(),
    );
    let results = engine
        .predict(&request(GermlineStatus::Unknown, None))
        .await
        .unwrap();

    for result in &results {
        assert!(
            result.confidence <= 0.4 + 1e-9,
            "{} confidence {} exceeds zero-biomarker cap",
            result.drug,
            result.confidence
        );
    }
    assert!(results
        .iter()
        .any(|r| r.adjustments.iter().any(|a| a.rule == GateRule::CompletenessCap)));
}

// ── Evidence integration ────────────────────────────────────────────────────

#[tokio::test]
async fn pathogenic_prior_lifts_score_and_badges() {
    let with_prior = build_engine(
        MockLiteratureIndex::failing(),
        MockVariantDb::new().with(
            "BRCA1",
            ClinvarRecord {
                classification: ClinvarClassification::Pathogenic,
                review_status: ReviewStatus::ExpertPanel,
            },
        ),
    );
    let without_prior = build_engine(MockLiteratureIndex::failing(), MockVariantDb::new());

    let req = request(GermlineStatus::Positive, Some(full_context(55.0, 4.0)));
    let lifted = with_prior.predict(&req).await.unwrap();
    let plain = without_prior.predict(&req).await.unwrap();

    let olaparib_lifted = drug(&lifted, "Olaparib");
    let olaparib_plain = drug(&plain, "Olaparib");

    assert!(olaparib_lifted.badges.contains(&Badge::ClinvarStrong));
    assert!(olaparib_lifted.score > olaparib_plain.score);
    assert!((olaparib_lifted.rationale.clinvar_adjustment - 0.2).abs() < 1e-9);
}

#[tokio::test]
async fn literature_failure_degrades_without_failing_request() {
    let engine = build_engine(MockLiteratureIndex::failing(), MockVariantDb::new());
    let results = engine
        .predict(&request(GermlineStatus::Positive, Some(full_context(55.0, 4.0))))
        .await
        .unwrap();

    assert_eq!(results.len(), DrugPanel::builtin().drugs.len());
    for result in &results {
        assert!(result.provenance.literature_failed);
        assert_eq!(result.rationale.evidence_strength, 0.0);
    }
    // Sequence and pathway signal still produce a usable score.
    assert!(drug(&results, "Olaparib").score > 0.0);
}

// ── Request handling ────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_request_is_rejected() {
    let engine = build_engine(MockLiteratureIndex::failing(), MockVariantDb::new());
    let req = PredictionRequest {
        mutations: vec![],
        germline_status: GermlineStatus::Unknown,
        tumor_context: None,
        disease: "ovarian cancer".into(),
        options: PredictOptions::default(),
    };
    assert!(matches!(
        engine.predict(&req).await,
        Err(OncoselError::InvalidRequest(_))
    ));
}

#[tokio::test]
async fn invalid_variant_dropped_with_provenance() {
    let engine = build_engine(MockLiteratureIndex::failing(), MockVariantDb::new());
    let mut req = request(GermlineStatus::Positive, Some(full_context(55.0, 4.0)));
    // Gene only: no protein or cDNA change, no coordinates, unscoreable.
    req.mutations.push(VariantInput {
        gene: "TP53".into(),
        hgvs_p: None,
        hgvs_c: None,
        coords: None,
        consequence: ConsequenceClass::Missense,
    });

    let results = engine.predict(&req).await.unwrap();
    assert!(!results.is_empty());
    for result in &results {
        assert_eq!(result.provenance.dropped_variants.len(), 1);
    }
    // The valid variant still scored.
    assert!(drug(&results, "Olaparib").rationale.seq_component > 0.0);
}

#[tokio::test]
async fn degraded_scoring_yields_insufficient_and_filtering_drops_it() {
    // Every engine fails: scores degrade to zero placeholders.
    let engine = scoring_engine(
        MockLiteratureIndex::failing(),
        MockVariantDb::new(),
        MockEngine::failing("down"),
    );

    let mut req = request(GermlineStatus::Unknown, Some(full_context(55.0, 4.0)));
    let all = engine.predict(&req).await.unwrap();
    assert_eq!(all.len(), DrugPanel::builtin().drugs.len());
    for result in &all {
        assert_eq!(result.tier, Tier::Insufficient);
        assert_eq!(result.provenance.degraded_variants.len(), 1);
    }

    req.options.include_all_drugs = false;
    let filtered = engine.predict(&req).await.unwrap();
    assert!(filtered.is_empty());
}

/// Fails scoring for one gene, succeeds for the rest.
struct GeneFailingEngine {
    failing_gene: String,
}

#[async_trait::async_trait]
impl ScoringEngine for GeneFailingEngine {
    fn name(&self) -> &str {
        "gene_failing"
    }

    async fn score(
        &self,
        variant: &oncosel_common::entities::Variant,
        window: u32,
    ) -> anyhow::Result<EngineScore> {
        if variant.gene == self.failing_gene {
            anyhow::bail!("backend rejected {}", variant.gene);
        }
        Ok(EngineScore {
            disruption: 2.0,
            confidence: 0.9,
            engine: "gene_failing".into(),
            window,
        })
    }
}

#[tokio::test]
async fn one_failing_variant_still_yields_pathway_signal() {
    let cache = Arc::new(ScoreCache::new(Duration::from_secs(600)));
    let scorer = SequenceScorer::new(cache).with_engine(Arc::new(GeneFailingEngine {
        failing_gene: "BRCA1".into(),
    }));
    let insights = InsightsClient::new(Arc::new(
        MockInsightsProvider::new().with(InsightEndpoint::Essentiality, 0.9),
    ));
    let engine = EfficacyEngine::new(
        scorer,
        LiteratureScorer::new(Arc::new(MockLiteratureIndex::failing())),
        Arc::new(MockVariantDb::new()) as Arc<dyn CuratedVariantDb>,
        insights,
        DrugPanel::builtin(),
        ConfidenceConfig::default(),
        GateConfig::default(),
    )
    .unwrap();

    let mut req = request(GermlineStatus::Positive, Some(full_context(55.0, 4.0)));
    // TP53 scores fine and contributes to the DNA-damage-response pathway.
    req.mutations.push(VariantInput {
        gene: "TP53".into(),
        hgvs_p: Some("p.Arg175His".into()),
        hgvs_c: None,
        coords: None,
        consequence: ConsequenceClass::Missense,
    });

    let results = engine.predict(&req).await.unwrap();
    let olaparib = drug(&results, "Olaparib");

    assert_eq!(olaparib.provenance.degraded_variants, vec!["BRCA1:p.Gln1756fs".to_string()]);
    assert!(olaparib.rationale.pathway_component > 0.0);
    assert!(olaparib.rationale.seq_component > 0.0);
}

#[tokio::test]
async fn repeated_prediction_hits_the_score_cache() {
    let engine = build_engine(MockLiteratureIndex::failing(), MockVariantDb::new());
    let req = request(GermlineStatus::Positive, Some(full_context(55.0, 4.0)));

    let first = engine.predict(&req).await.unwrap();
    assert!(first[0].provenance.cache_hits.is_empty());

    let second = engine.predict(&req).await.unwrap();
    assert_eq!(
        second[0].provenance.cache_hits,
        vec!["BRCA1:p.Gln1756fs".to_string()]
    );
}

#[tokio::test]
async fn results_ranked_by_score_descending() {
    let engine = build_engine(
        MockLiteratureIndex::with_docs(vec![doc(
            "parp inhibitor maintenance trial",
            "Randomized Controlled Trial",
        )]),
        MockVariantDb::new(),
    );
    let results = engine
        .predict(&request(GermlineStatus::Positive, Some(full_context(55.0, 4.0))))
        .await
        .unwrap();

    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    // Same request id threaded through every result.
    let id = results[0].provenance.request_id;
    assert!(results.iter().all(|r| r.provenance.request_id == id));
}
