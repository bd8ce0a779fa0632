//! Adaptive-window ensemble.
//!
//! Wraps an inner engine and retries it at increasing context sizes,
//! keeping the most confident result. Escalation stops early once a
//! result clears the inner engine's confidence floor.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use oncosel_common::entities::Variant;

use crate::engine::{EngineScore, ScoringEngine, WINDOW_LADDER};

pub struct AdaptiveWindowEngine {
    inner: Arc<dyn ScoringEngine>,
    windows: Vec<u32>,
}

impl AdaptiveWindowEngine {
    pub fn new(inner: Arc<dyn ScoringEngine>) -> Self {
        Self { inner, windows: WINDOW_LADDER.to_vec() }
    }

    pub fn with_windows(mut self, windows: Vec<u32>) -> Self {
        self.windows = windows;
        self
    }
}

#[async_trait]
impl ScoringEngine for AdaptiveWindowEngine {
    fn name(&self) -> &str {
        "adaptive_window"
    }

    fn confidence_floor(&self) -> f64 {
        // The ensemble already retried; accept whatever it found.
        0.0
    }

    async fn score(&self, variant: &Variant, _window: u32) -> anyhow::Result<EngineScore> {
        let mut best: Option<EngineScore> = None;
        let mut last_err: Option<anyhow::Error> = None;

        for &window in &self.windows {
            match self.inner.score(variant, window).await {
                Ok(score) => {
                    debug!(
                        window,
                        confidence = score.confidence,
                        "ensemble window attempt"
                    );
                    let clears_floor = score.confidence >= self.inner.confidence_floor();
                    let improves = best
                        .as_ref()
                        .map(|b| score.confidence > b.confidence)
                        .unwrap_or(true);
                    if improves {
                        best = Some(score);
                    }
                    if clears_floor {
                        break;
                    }
                }
                Err(e) => {
                    warn!(window, error = %e, "ensemble window attempt failed");
                    last_err = Some(e);
                }
            }
        }

        match best {
            Some(mut score) => {
                score.engine = format!("{}+{}", self.inner.name(), self.name());
                Ok(score)
            }
            None => Err(last_err
                .unwrap_or_else(|| anyhow::anyhow!("no windows configured for ensemble"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oncosel_common::entities::ConsequenceClass;

    /// Engine whose confidence rises with window size.
    struct WindowSensitive;

    #[async_trait]
    impl ScoringEngine for WindowSensitive {
        fn name(&self) -> &str {
            "sensitive"
        }

        fn confidence_floor(&self) -> f64 {
            0.6
        }

        async fn score(&self, _v: &Variant, window: u32) -> anyhow::Result<EngineScore> {
            Ok(EngineScore {
                disruption: 1.0,
                confidence: window as f64 / 8192.0,
                engine: "sensitive".into(),
                window,
            })
        }
    }

    fn variant() -> Variant {
        Variant::new("TP53", Some("p.R175H".into()), None, None, ConsequenceClass::Missense)
            .unwrap()
    }

    #[tokio::test]
    async fn test_escalates_until_floor_cleared() {
        let ensemble = AdaptiveWindowEngine::new(Arc::new(WindowSensitive));
        let score = ensemble.score(&variant(), 0).await.unwrap();
        // 1024/8192 = 0.125, 2048 = 0.25, 4096 = 0.5, 8192 = 1.0 >= 0.6
        assert_eq!(score.window, 8192);
        assert!((score.confidence - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_keeps_most_confident_when_floor_never_cleared() {
        let ensemble = AdaptiveWindowEngine::new(Arc::new(WindowSensitive))
            .with_windows(vec![1024, 2048]);
        let score = ensemble.score(&variant(), 0).await.unwrap();
        assert_eq!(score.window, 2048);
        assert!((score.confidence - 0.25).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_all_windows_failing_is_error() {
        let inner = Arc::new(crate::engine::MockEngine::failing("down"));
        let ensemble = AdaptiveWindowEngine::new(inner);
        assert!(ensemble.score(&variant(), 0).await.is_err());
    }
}
