//! Remote variant-scoring backend client.
//!
//! The backend is an opaque scoring service: given a variant and a
//! context window size it returns a disruption magnitude and a
//! confidence. Larger windows get larger timeouts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use oncosel_common::entities::Variant;
use oncosel_common::http::BoundedClient;

use crate::engine::{EngineScore, ScoringEngine};

/// Base timeout for the smallest window; each doubling of the window
/// adds the same increment again.
const BASE_TIMEOUT: Duration = Duration::from_secs(4);

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    gene: &'a str,
    hgvs_p: Option<&'a str>,
    chromosome: Option<&'a str>,
    position: Option<u64>,
    reference: Option<&'a str>,
    alternate: Option<&'a str>,
    window: u32,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    disruption: f64,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

fn default_confidence() -> f64 {
    0.5
}

pub struct RemoteEngine {
    name: String,
    client: BoundedClient,
    base_url: String,
    confidence_floor: f64,
}

impl RemoteEngine {
    pub fn new(name: &str, client: BoundedClient, base_url: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            client,
            base_url: base_url.into(),
            confidence_floor: 0.35,
        }
    }

    pub fn with_confidence_floor(mut self, floor: f64) -> Self {
        self.confidence_floor = floor;
        self
    }

    /// Timeout budget for a given window size.
    fn timeout_for(window: u32) -> Duration {
        let steps = (window / 1024).max(1).ilog2();
        BASE_TIMEOUT + Duration::from_secs(2) * steps
    }
}

#[async_trait]
impl ScoringEngine for RemoteEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn confidence_floor(&self) -> f64 {
        self.confidence_floor
    }

    #[instrument(skip(self, variant), fields(variant = %variant.identity()))]
    async fn score(&self, variant: &Variant, window: u32) -> anyhow::Result<EngineScore> {
        let coords = variant.coords.as_ref();
        let body = ScoreRequest {
            gene: &variant.gene,
            hgvs_p: variant.hgvs_p.as_deref(),
            chromosome: coords.map(|c| c.chromosome.as_str()),
            position: coords.map(|c| c.position),
            reference: coords.map(|c| c.reference.as_str()),
            alternate: coords.map(|c| c.alternate.as_str()),
            window,
        };

        let url = format!("{}/score", self.base_url.trim_end_matches('/'));
        let resp: ScoreResponse = self
            .client
            .post_with_timeout(&url, Self::timeout_for(window))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(
            engine = %self.name,
            window,
            disruption = resp.disruption,
            confidence = resp.confidence,
            "remote engine scored variant"
        );

        Ok(EngineScore {
            disruption: resp.disruption,
            confidence: resp.confidence.clamp(0.0, 1.0),
            engine: self.name.clone(),
            window,
        })
    }
}
