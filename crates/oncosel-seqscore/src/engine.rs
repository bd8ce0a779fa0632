//! Scoring engine trait and the last-resort heuristic engine.
//!
//! Engines are tried in a fixed fallback order by the scorer; each
//! reports a self-assessed confidence so the router can decide when
//! to escalate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use oncosel_common::entities::Variant;

/// Context window sizes (bp) tried by the adaptive ensemble, smallest
/// first.
pub const WINDOW_LADDER: [u32; 4] = [1024, 2048, 4096, 8192];

/// Default window for a single primary-engine call.
pub const DEFAULT_WINDOW: u32 = 2048;

/// Raw result from one engine invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineScore {
    /// Disruption magnitude in the engine's native units (unbounded).
    pub disruption: f64,
    /// Engine-reported confidence in [0, 1].
    pub confidence: f64,
    pub engine: String,
    pub window: u32,
}

/// A variant-scoring engine. Implementations: the remote backend, the
/// adaptive-window ensemble wrapping it, and the heuristic fallback.
#[async_trait]
pub trait ScoringEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Confidence below which the fallback router escalates to the
    /// next engine in the ladder.
    fn confidence_floor(&self) -> f64 {
        0.2
    }

    async fn score(&self, variant: &Variant, window: u32) -> anyhow::Result<EngineScore>;
}

// ── Heuristic fallback ──────────────────────────────────────────────────────

/// Last-resort simplified scorer: maps the variant's consequence
/// class to a disruption prior. Never fails, never calls out.
pub struct HeuristicEngine;

#[async_trait]
impl ScoringEngine for HeuristicEngine {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn confidence_floor(&self) -> f64 {
        // Last rung of the ladder: always accept.
        0.0
    }

    async fn score(&self, variant: &Variant, window: u32) -> anyhow::Result<EngineScore> {
        Ok(EngineScore {
            disruption: variant.consequence.severity(),
            confidence: 0.3,
            engine: self.name().to_string(),
            window,
        })
    }
}

// ── Mock engine for tests ───────────────────────────────────────────────────

/// Scripted engine for unit tests: returns a fixed score, or fails,
/// and counts invocations.
pub struct MockEngine {
    name: String,
    result: Option<EngineScore>,
    pub calls: std::sync::atomic::AtomicUsize,
}

impl MockEngine {
    pub fn succeeding(name: &str, disruption: f64, confidence: f64) -> Self {
        Self {
            name: name.to_string(),
            result: Some(EngineScore {
                disruption,
                confidence,
                engine: name.to_string(),
                window: DEFAULT_WINDOW,
            }),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            result: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl ScoringEngine for MockEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, _variant: &Variant, window: u32) -> anyhow::Result<EngineScore> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match &self.result {
            Some(s) => Ok(EngineScore { window, ..s.clone() }),
            None => anyhow::bail!("engine {} unavailable", self.name),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
