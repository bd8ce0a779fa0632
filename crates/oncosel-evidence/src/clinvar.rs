//! Curated-variant-database priors.
//!
//! Maps classification × review-status strength to a signed prior
//! adjustment in [-0.2, 0.2]: pathogenic with strong review pushes a
//! drug's evidence up the full +0.2, benign mirrors it down, and
//! weaker review statuses scale toward ±0.05.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

use oncosel_common::entities::GenomicCoords;
use oncosel_common::http::BoundedClient;

pub const CLINVAR_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinvarClassification {
    Pathogenic,
    LikelyPathogenic,
    UncertainSignificance,
    LikelyBenign,
    Benign,
}

impl ClinvarClassification {
    /// Signed direction and scale of the prior: likely-* calls carry
    /// three quarters of the definitive weight, VUS carries none.
    pub fn direction(&self) -> f64 {
        match self {
            ClinvarClassification::Pathogenic            => 1.0,
            ClinvarClassification::LikelyPathogenic      => 0.75,
            ClinvarClassification::UncertainSignificance => 0.0,
            ClinvarClassification::LikelyBenign          => -0.75,
            ClinvarClassification::Benign                => -1.0,
        }
    }

    pub fn from_label(label: &str) -> Self {
        let l = label.to_lowercase();
        if l.contains("pathogenic") && l.contains("likely") {
            ClinvarClassification::LikelyPathogenic
        } else if l.contains("pathogenic") {
            ClinvarClassification::Pathogenic
        } else if l.contains("benign") && l.contains("likely") {
            ClinvarClassification::LikelyBenign
        } else if l.contains("benign") {
            ClinvarClassification::Benign
        } else {
            ClinvarClassification::UncertainSignificance
        }
    }
}

/// ClinVar review status, ordered by assertion strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    PracticeGuideline,
    ExpertPanel,
    MultipleSubmittersNoConflict,
    SingleSubmitter,
    NoAssertionCriteria,
}

impl ReviewStatus {
    /// Strength in [0, 1]: scales the prior magnitude.
    pub fn strength(&self) -> f64 {
        match self {
            ReviewStatus::PracticeGuideline            => 1.0,
            ReviewStatus::ExpertPanel                  => 1.0,
            ReviewStatus::MultipleSubmittersNoConflict => 0.5,
            ReviewStatus::SingleSubmitter              => 0.25,
            ReviewStatus::NoAssertionCriteria          => 0.0,
        }
    }

    /// Strong review statuses qualify for the ClinVar-Strong badge.
    pub fn is_strong(&self) -> bool {
        self.strength() >= 1.0
    }

    pub fn from_label(label: &str) -> Self {
        let l = label.to_lowercase();
        if l.contains("practice guideline") {
            ReviewStatus::PracticeGuideline
        } else if l.contains("expert panel") {
            ReviewStatus::ExpertPanel
        } else if l.contains("multiple submitters") && l.contains("no conflict") {
            ReviewStatus::MultipleSubmittersNoConflict
        } else if l.contains("single submitter") {
            ReviewStatus::SingleSubmitter
        } else {
            ReviewStatus::NoAssertionCriteria
        }
    }
}

/// Record returned by the curated database for one variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinvarRecord {
    pub classification: ClinvarClassification,
    pub review_status: ReviewStatus,
}

/// Derived prior for the confidence fusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinvarPrior {
    pub record: Option<ClinvarRecord>,
    /// Signed adjustment in [-0.2, 0.2].
    pub adjustment: f64,
    /// True when the lookup failed (adjustment is 0).
    pub failed: bool,
}

impl ClinvarPrior {
    pub fn absent() -> Self {
        Self { record: None, adjustment: 0.0, failed: false }
    }

    fn failed() -> Self {
        Self { record: None, adjustment: 0.0, failed: true }
    }

    /// Prior magnitude ramps from 0.05 (weakest review) to 0.2
    /// (strong review), signed by classification.
    pub fn from_record(record: ClinvarRecord) -> Self {
        let direction = record.classification.direction();
        let adjustment = if direction == 0.0 {
            0.0
        } else {
            direction * (0.05 + 0.15 * record.review_status.strength())
        };
        Self { record: Some(record), adjustment, failed: false }
    }
}

/// Common interface for the curated-variant database.
#[async_trait]
pub trait CuratedVariantDb: Send + Sync {
    /// Lookup by gene and genomic coordinates. `None` means the
    /// variant is not in the database (a valid state, not an error).
    async fn lookup(
        &self,
        gene: &str,
        coords: Option<&GenomicCoords>,
    ) -> anyhow::Result<Option<ClinvarRecord>>;
}

/// Timeout-guarded prior lookup. Never fails: failure or timeout
/// yields a zero prior flagged for provenance.
#[instrument(skip(db, coords))]
pub async fn clinvar_prior(
    db: &Arc<dyn CuratedVariantDb>,
    gene: &str,
    coords: Option<&GenomicCoords>,
    timeout: Duration,
) -> ClinvarPrior {
    match tokio::time::timeout(timeout, db.lookup(gene, coords)).await {
        Ok(Ok(Some(record))) => ClinvarPrior::from_record(record),
        Ok(Ok(None)) => ClinvarPrior::absent(),
        Ok(Err(e)) => {
            warn!(error = %e, "curated-variant lookup failed");
            ClinvarPrior::failed()
        }
        Err(_) => {
            warn!(?timeout, "curated-variant lookup timed out");
            ClinvarPrior::failed()
        }
    }
}

// ── HTTP client ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LookupResponse {
    classification: Option<String>,
    review_status: Option<String>,
}

pub struct ClinvarHttpClient {
    client: BoundedClient,
    base_url: String,
}

impl ClinvarHttpClient {
    pub fn new(client: BoundedClient, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }
}

#[async_trait]
impl CuratedVariantDb for ClinvarHttpClient {
    async fn lookup(
        &self,
        gene: &str,
        coords: Option<&GenomicCoords>,
    ) -> anyhow::Result<Option<ClinvarRecord>> {
        let url = format!("{}/variant", self.base_url.trim_end_matches('/'));
        let mut params = vec![("gene", gene.to_string())];
        if let Some(c) = coords {
            params.push(("chromosome", c.chromosome.clone()));
            params.push(("position", c.position.to_string()));
            params.push(("reference", c.reference.clone()));
            params.push(("alternate", c.alternate.clone()));
        }

        let resp = self.client.get(&url).query(&params).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: LookupResponse = resp.error_for_status()?.json().await?;

        let Some(classification) = body.classification else {
            return Ok(None);
        };
        Ok(Some(ClinvarRecord {
            classification: ClinvarClassification::from_label(&classification),
            review_status: ReviewStatus::from_label(
                body.review_status.as_deref().unwrap_or(""),
            ),
        }))
    }
}

// ── Mock database for tests ─────────────────────────────────────────────────

pub struct MockVariantDb {
    records: std::collections::HashMap<String, ClinvarRecord>,
    fail: bool,
}

impl MockVariantDb {
    pub fn new() -> Self {
        Self { records: Default::default(), fail: false }
    }

    pub fn with(mut self, gene: &str, record: ClinvarRecord) -> Self {
        self.records.insert(gene.to_string(), record);
        self
    }

    pub fn failing() -> Self {
        Self { records: Default::default(), fail: true }
    }
}

impl Default for MockVariantDb {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CuratedVariantDb for MockVariantDb {
    async fn lookup(
        &self,
        gene: &str,
        _coords: Option<&GenomicCoords>,
    ) -> anyhow::Result<Option<ClinvarRecord>> {
        if self.fail {
            anyhow::bail!("curated database unavailable");
        }
        Ok(self.records.get(gene).cloned())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
