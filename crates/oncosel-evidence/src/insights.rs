//! Auxiliary insights bundle.
//!
//! Up to four independent predictor queries per variant, issued
//! concurrently. A query is skipped (not failed) when its required
//! inputs are absent; a per-endpoint failure leaves that field absent
//! without failing the bundle.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use oncosel_common::entities::Variant;
use oncosel_common::http::BoundedClient;

pub const INSIGHTS_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightEndpoint {
    Functionality,
    Chromatin,
    Essentiality,
    Regulatory,
}

impl InsightEndpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightEndpoint::Functionality => "functionality",
            InsightEndpoint::Chromatin     => "chromatin",
            InsightEndpoint::Essentiality  => "essentiality",
            InsightEndpoint::Regulatory    => "regulatory",
        }
    }

    /// Required inputs: chromatin and regulatory impact need genomic
    /// coordinates; functionality needs a protein-change annotation;
    /// essentiality only needs the gene.
    pub fn inputs_satisfied(&self, variant: &Variant) -> bool {
        match self {
            InsightEndpoint::Functionality => variant.hgvs_p.is_some(),
            InsightEndpoint::Chromatin | InsightEndpoint::Regulatory => variant.coords.is_some(),
            InsightEndpoint::Essentiality => true,
        }
    }
}

/// Why an endpoint's score is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum InsightOutcome {
    Ok,
    SkippedMissingInput,
    Failed(String),
}

/// A per-endpoint note recorded in provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightNote {
    pub endpoint: InsightEndpoint,
    pub outcome: InsightOutcome,
}

/// The bundle: each score optional, absence explained by the notes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsightsBundle {
    pub functionality: Option<f64>,
    pub chromatin: Option<f64>,
    pub essentiality: Option<f64>,
    pub regulatory: Option<f64>,
    pub notes: Vec<InsightNote>,
}

/// Common interface for the auxiliary predictors (one service, four
/// endpoints — or a mock).
#[async_trait]
pub trait InsightsProvider: Send + Sync {
    async fn query(&self, endpoint: InsightEndpoint, variant: &Variant) -> anyhow::Result<f64>;
}

pub struct InsightsClient {
    provider: Arc<dyn InsightsProvider>,
    timeout: Duration,
}

impl InsightsClient {
    pub fn new(provider: Arc<dyn InsightsProvider>) -> Self {
        Self { provider, timeout: INSIGHTS_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Query all satisfiable endpoints concurrently. The bundle
    /// itself never fails.
    #[instrument(skip(self, variant), fields(variant = %variant.identity()))]
    pub async fn bundle(&self, variant: &Variant) -> InsightsBundle {
        let (functionality, chromatin, essentiality, regulatory) = tokio::join!(
            self.one(InsightEndpoint::Functionality, variant),
            self.one(InsightEndpoint::Chromatin, variant),
            self.one(InsightEndpoint::Essentiality, variant),
            self.one(InsightEndpoint::Regulatory, variant),
        );

        let mut bundle = InsightsBundle::default();
        for (endpoint, (score, outcome)) in [
            (InsightEndpoint::Functionality, functionality),
            (InsightEndpoint::Chromatin, chromatin),
            (InsightEndpoint::Essentiality, essentiality),
            (InsightEndpoint::Regulatory, regulatory),
        ] {
            match endpoint {
                InsightEndpoint::Functionality => bundle.functionality = score,
                InsightEndpoint::Chromatin     => bundle.chromatin = score,
                InsightEndpoint::Essentiality  => bundle.essentiality = score,
                InsightEndpoint::Regulatory    => bundle.regulatory = score,
            }
            bundle.notes.push(InsightNote { endpoint, outcome });
        }

        debug!(
            functionality = ?bundle.functionality,
            chromatin = ?bundle.chromatin,
            essentiality = ?bundle.essentiality,
            regulatory = ?bundle.regulatory,
            "insights bundle assembled"
        );
        bundle
    }

    async fn one(
        &self,
        endpoint: InsightEndpoint,
        variant: &Variant,
    ) -> (Option<f64>, InsightOutcome) {
        if !endpoint.inputs_satisfied(variant) {
            return (None, InsightOutcome::SkippedMissingInput);
        }

        match tokio::time::timeout(self.timeout, self.provider.query(endpoint, variant)).await {
            Ok(Ok(score)) => (Some(score.clamp(0.0, 1.0)), InsightOutcome::Ok),
            Ok(Err(e)) => {
                warn!(endpoint = endpoint.as_str(), error = %e, "insights endpoint failed");
                (None, InsightOutcome::Failed(e.to_string()))
            }
            Err(_) => {
                warn!(endpoint = endpoint.as_str(), "insights endpoint timed out");
                (None, InsightOutcome::Failed("timeout".into()))
            }
        }
    }
}

// ── HTTP provider ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PredictorResponse {
    score: f64,
}

pub struct HttpInsightsProvider {
    client: BoundedClient,
    base_url: String,
}

impl HttpInsightsProvider {
    pub fn new(client: BoundedClient, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }
}

#[async_trait]
impl InsightsProvider for HttpInsightsProvider {
    async fn query(&self, endpoint: InsightEndpoint, variant: &Variant) -> anyhow::Result<f64> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.as_str()
        );
        let mut params = vec![("gene", variant.gene.clone())];
        if let Some(p) = &variant.hgvs_p {
            params.push(("hgvs_p", p.clone()));
        }
        if let Some(c) = &variant.coords {
            params.push(("chromosome", c.chromosome.clone()));
            params.push(("position", c.position.to_string()));
            params.push(("reference", c.reference.clone()));
            params.push(("alternate", c.alternate.clone()));
        }

        let resp: PredictorResponse = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.score)
    }
}

// ── Mock provider for tests ─────────────────────────────────────────────────

pub struct MockInsightsProvider {
    scores: std::collections::HashMap<InsightEndpoint, f64>,
    failing: std::collections::HashSet<InsightEndpoint>,
}

impl MockInsightsProvider {
    pub fn new() -> Self {
        Self { scores: Default::default(), failing: Default::default() }
    }

    pub fn with(mut self, endpoint: InsightEndpoint, score: f64) -> Self {
        self.scores.insert(endpoint, score);
        self
    }

    pub fn failing_on(mut self, endpoint: InsightEndpoint) -> Self {
        self.failing.insert(endpoint);
        self
    }
}

impl Default for MockInsightsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InsightsProvider for MockInsightsProvider {
    async fn query(&self, endpoint: InsightEndpoint, _variant: &Variant) -> anyhow::Result<f64> {
        if self.failing.contains(&endpoint) {
            anyhow::bail!("{} endpoint unavailable", endpoint.as_str());
        }
        self.scores
            .get(&endpoint)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no score configured for {}", endpoint.as_str()))
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
