//! Sequence scorer — composes the engine fallback ladder with the
//! single-flight cache.
//!
//! Contract: scoring never fails. If every engine is unavailable the
//! variant gets a zero-disruption score flagged `degraded`; callers
//! treat degraded scores as low-confidence, not absent.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use oncosel_common::entities::Variant;
use oncosel_common::http::BoundedClient;

use crate::cache::{CacheKey, ScoreCache};
use crate::engine::{EngineScore, HeuristicEngine, ScoringEngine, DEFAULT_WINDOW};
use crate::ensemble::AdaptiveWindowEngine;
use crate::normalise::{normalise_disruption, ReferenceDistribution};
use crate::remote::RemoteEngine;

/// Final per-variant sequence-disruption score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceScore {
    /// Variant identity string (cache key component).
    pub variant: String,
    /// Raw disruption magnitude in engine units.
    pub disruption: f64,
    /// Disruption squashed into [0, 1].
    pub normalized: f64,
    /// Rank against the reference population, in [0, 1].
    pub percentile: f64,
    pub engine: String,
    pub window: u32,
    /// True when every engine failed and this is a zero placeholder.
    pub degraded: bool,
    /// True when served from the shared cache.
    pub cache_hit: bool,
}

impl SequenceScore {
    fn from_engine(variant: &Variant, score: EngineScore, reference: &ReferenceDistribution) -> Self {
        Self {
            variant: variant.identity(),
            disruption: score.disruption,
            normalized: normalise_disruption(score.disruption),
            percentile: reference.percentile(score.disruption),
            engine: score.engine,
            window: score.window,
            degraded: false,
            cache_hit: false,
        }
    }

    fn degraded(variant: &Variant) -> Self {
        Self {
            variant: variant.identity(),
            disruption: 0.0,
            normalized: 0.0,
            percentile: 0.0,
            engine: "none".into(),
            window: 0,
            degraded: true,
            cache_hit: false,
        }
    }
}

pub struct SequenceScorer {
    engines: Vec<Arc<dyn ScoringEngine>>,
    cache: Arc<ScoreCache>,
    reference: ReferenceDistribution,
}

impl SequenceScorer {
    pub fn new(cache: Arc<ScoreCache>) -> Self {
        Self {
            engines: Vec::new(),
            cache,
            reference: ReferenceDistribution::builtin(),
        }
    }

    /// Append an engine to the fallback ladder (tried in insertion
    /// order).
    pub fn with_engine(mut self, engine: Arc<dyn ScoringEngine>) -> Self {
        self.engines.push(engine);
        self
    }

    pub fn with_reference(mut self, reference: ReferenceDistribution) -> Self {
        self.reference = reference;
        self
    }

    /// Production ladder: remote primary, then the same backend
    /// retried through the adaptive-window ensemble, then the
    /// consequence-class heuristic.
    pub fn standard(client: BoundedClient, backend_url: &str, cache: Arc<ScoreCache>) -> Self {
        let remote: Arc<dyn ScoringEngine> =
            Arc::new(RemoteEngine::new("primary", client, backend_url));
        Self::new(cache)
            .with_engine(remote.clone())
            .with_engine(Arc::new(AdaptiveWindowEngine::new(remote)))
            .with_engine(Arc::new(HeuristicEngine))
    }

    /// Score a variant, consulting the cache first. `engine_hint`
    /// moves the named engine to the front of the ladder.
    #[instrument(skip(self, variant), fields(variant = %variant.identity()))]
    pub async fn score(&self, variant: &Variant, engine_hint: Option<&str>) -> SequenceScore {
        let key = CacheKey::new(
            variant.identity(),
            engine_hint.unwrap_or("auto"),
            DEFAULT_WINDOW,
        );

        let (mut score, hit) = self
            .cache
            .get_or_compute(key, || self.run_ladder(variant, engine_hint))
            .await;
        score.cache_hit = hit;
        score
    }

    async fn run_ladder(&self, variant: &Variant, engine_hint: Option<&str>) -> SequenceScore {
        let mut order: Vec<&Arc<dyn ScoringEngine>> = self.engines.iter().collect();
        if let Some(hint) = engine_hint {
            if let Some(pos) = order.iter().position(|e| e.name() == hint) {
                let preferred = order.remove(pos);
                order.insert(0, preferred);
            }
        }

        // Below-floor results are kept as a fallback: a weak answer
        // beats a degraded zero if nothing better turns up.
        let mut best_attempt: Option<EngineScore> = None;

        for engine in order {
            match engine.score(variant, DEFAULT_WINDOW).await {
                Ok(score) => {
                    if score.confidence >= engine.confidence_floor() {
                        debug!(engine = engine.name(), "engine accepted");
                        return SequenceScore::from_engine(variant, score, &self.reference);
                    }
                    debug!(
                        engine = engine.name(),
                        confidence = score.confidence,
                        "engine result below confidence floor, escalating"
                    );
                    let improves = best_attempt
                        .as_ref()
                        .map(|b| score.confidence > b.confidence)
                        .unwrap_or(true);
                    if improves {
                        best_attempt = Some(score);
                    }
                }
                Err(e) => {
                    warn!(engine = engine.name(), error = %e, "engine failed, escalating");
                }
            }
        }

        match best_attempt {
            Some(score) => SequenceScore::from_engine(variant, score, &self.reference),
            None => {
                warn!(variant = %variant.identity(), "all scoring engines failed, degrading");
                SequenceScore::degraded(variant)
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
