//! Literature index client and evidence-strength scoring.
//!
//! Endpoints used (E-utilities style):
//!   esearch:  {base}/esearch.fcgi?db=pubmed&term=...&retmode=json
//!   esummary: {base}/esummary.fcgi?db=pubmed&id=...&retmode=json
//!
//! The top-N results are scored by publication-type weight
//! (randomized controlled trial > guideline > review > other), summed
//! and capped at 1.0, plus an additive boost per mechanism-of-action
//! term hit.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use oncosel_common::entities::MoaClass;
use oncosel_common::http::BoundedClient;

use crate::synonyms::expand_query;

/// Hard timeout for one literature lookup (search + summaries).
pub const LITERATURE_TIMEOUT: Duration = Duration::from_secs(8);

/// Number of top search results scored.
const TOP_N: usize = 3;

/// Additive strength per mechanism-term hit, capped.
const MOA_HIT_BOOST: f64 = 0.05;
const MOA_BOOST_CAP: f64 = 0.25;

/// One ranked document from the literature index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteratureDoc {
    pub id: String,
    pub title: String,
    pub pub_types: Vec<String>,
}

impl LiteratureDoc {
    /// Publication-type weight: the strongest tag on the document
    /// wins.
    pub fn type_weight(&self) -> f64 {
        let mut best = 0.1; // other
        for tag in &self.pub_types {
            let t = tag.to_lowercase();
            let w = if t.contains("randomized controlled trial") {
                0.5
            } else if t.contains("guideline") {
                0.35
            } else if t.contains("review") || t.contains("meta-analysis") {
                0.2
            } else {
                0.1
            };
            if w > best {
                best = w;
            }
        }
        best
    }
}

/// Common interface for literature indexes (HTTP client or mock).
#[async_trait]
pub trait LiteratureIndex: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<LiteratureDoc>>;
}

// ── HTTP client ─────────────────────────────────────────────────────────────

pub struct EntrezClient {
    client: BoundedClient,
    base_url: String,
    api_key: Option<String>,
}

impl EntrezClient {
    pub fn new(client: BoundedClient, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self { client, base_url: base_url.into(), api_key }
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("retmode", "json".to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    #[instrument(skip(self))]
    async fn esearch(&self, query: &str, max: usize) -> anyhow::Result<Vec<String>> {
        let mut params = self.base_params();
        params.push(("term", query.to_string()));
        params.push(("retmax", max.to_string()));

        let url = format!("{}/esearch.fcgi", self.base_url.trim_end_matches('/'));
        let resp: serde_json::Value = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let ids = resp["esearchresult"]["idlist"]
            .as_array()
            .unwrap_or(&vec![])
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect();
        debug!(?ids, "literature esearch returned ids");
        Ok(ids)
    }

    #[instrument(skip(self))]
    async fn esummary(&self, ids: &[String]) -> anyhow::Result<Vec<LiteratureDoc>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let mut params = self.base_params();
        params.push(("id", ids.join(",")));

        let url = format!("{}/esummary.fcgi", self.base_url.trim_end_matches('/'));
        let resp: serde_json::Value = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let result = &resp["result"];
        let docs = ids
            .iter()
            .filter_map(|id| {
                let entry = &result[id];
                let title = entry["title"].as_str()?.to_string();
                let pub_types = entry["pubtype"]
                    .as_array()
                    .map(|a| {
                        a.iter()
                            .filter_map(|v| v.as_str().map(String::from))
                            .collect()
                    })
                    .unwrap_or_default();
                Some(LiteratureDoc { id: id.clone(), title, pub_types })
            })
            .collect();
        Ok(docs)
    }
}

#[async_trait]
impl LiteratureIndex for EntrezClient {
    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<LiteratureDoc>> {
        let ids = self.esearch(query, max_results).await?;
        self.esummary(&ids).await
    }
}

// ── Evidence scoring ────────────────────────────────────────────────────────

/// Evidence strength derived for one (gene, variant, drug) triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceHit {
    /// Strength in [0, 1].
    pub strength: f64,
    /// Count of mechanism-of-action term hits across scored titles.
    pub moa_term_hits: usize,
    /// All returned documents.
    pub raw_docs: Vec<LiteratureDoc>,
    /// The subset whose titles matched a mechanism term.
    pub mechanism_docs: Vec<LiteratureDoc>,
    /// The exact query sent, kept for the audit trail.
    pub query: String,
    /// True when the lookup failed or timed out (strength is 0).
    pub failed: bool,
}

impl EvidenceHit {
    fn empty(query: String, failed: bool) -> Self {
        Self {
            strength: 0.0,
            moa_term_hits: 0,
            raw_docs: vec![],
            mechanism_docs: vec![],
            query,
            failed,
        }
    }
}

pub struct LiteratureScorer {
    index: Arc<dyn LiteratureIndex>,
    timeout: Duration,
}

impl LiteratureScorer {
    pub fn new(index: Arc<dyn LiteratureIndex>) -> Self {
        Self { index, timeout: LITERATURE_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Score literature support for a (gene, variant, drug) triple.
    /// Never fails: timeout or HTTP failure yields a zero-strength
    /// hit with `failed = true`.
    #[instrument(skip(self))]
    pub async fn literature(
        &self,
        gene: &str,
        hgvs_p: Option<&str>,
        drug: &str,
        moa: &str,
        moa_class: MoaClass,
        disease: &str,
    ) -> EvidenceHit {
        let query = expand_query(gene, hgvs_p, drug, moa_class, disease);

        let docs = match tokio::time::timeout(self.timeout, self.index.search(&query, TOP_N)).await
        {
            Ok(Ok(docs)) => docs,
            Ok(Err(e)) => {
                warn!(error = %e, "literature search failed");
                return EvidenceHit::empty(query, true);
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "literature search timed out");
                return EvidenceHit::empty(query, true);
            }
        };

        let moa_terms: Vec<String> = moa
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .filter(|t| t.len() > 3)
            .collect();

        let mut type_sum = 0.0;
        let mut moa_term_hits = 0;
        let mut mechanism_docs = Vec::new();

        for doc in docs.iter().take(TOP_N) {
            type_sum += doc.type_weight();
            let title = doc.title.to_lowercase();
            let hits = moa_terms.iter().filter(|t| title.contains(t.as_str())).count();
            if hits > 0 {
                moa_term_hits += hits;
                mechanism_docs.push(doc.clone());
            }
        }

        let moa_boost = (moa_term_hits as f64 * MOA_HIT_BOOST).min(MOA_BOOST_CAP);
        let strength = (type_sum.min(1.0) + moa_boost).min(1.0);

        debug!(strength, moa_term_hits, n_docs = docs.len(), "literature evidence scored");

        EvidenceHit {
            strength,
            moa_term_hits,
            raw_docs: docs,
            mechanism_docs,
            query,
            failed: false,
        }
    }
}

// ── Mock index for tests ────────────────────────────────────────────────────

pub struct MockLiteratureIndex {
    docs: Vec<LiteratureDoc>,
    fail: bool,
}

impl MockLiteratureIndex {
    pub fn with_docs(docs: Vec<LiteratureDoc>) -> Self {
        Self { docs, fail: false }
    }

    pub fn failing() -> Self {
        Self { docs: vec![], fail: true }
    }
}

#[async_trait]
impl LiteratureIndex for MockLiteratureIndex {
    async fn search(&self, _query: &str, max: usize) -> anyhow::Result<Vec<LiteratureDoc>> {
        if self.fail {
            anyhow::bail!("index unavailable");
        }
        Ok(self.docs.iter().take(max).cloned().collect())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
