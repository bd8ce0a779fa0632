//! Core entity types shared across the scoring pipeline.
//! These are the request-scoped inputs: variants, drug candidates,
//! and tumor biomarker context.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{OncoselError, Result};

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

/// Genomic coordinates for a variant (GRCh38).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomicCoords {
    pub chromosome: String, // e.g. "17"
    pub position: u64,
    pub reference: String,
    pub alternate: String,
}

/// Predicted consequence class of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsequenceClass {
    Frameshift,
    Nonsense,
    SpliceSite,
    Missense,
    InframeIndel,
    Synonymous,
    Intronic,
    Other,
}

impl ConsequenceClass {
    /// Rough disruption prior used by the last-resort heuristic scorer.
    pub fn severity(&self) -> f64 {
        match self {
            ConsequenceClass::Frameshift   => 0.90,
            ConsequenceClass::Nonsense     => 0.85,
            ConsequenceClass::SpliceSite   => 0.75,
            ConsequenceClass::Missense     => 0.45,
            ConsequenceClass::InframeIndel => 0.40,
            ConsequenceClass::Synonymous   => 0.05,
            ConsequenceClass::Intronic     => 0.05,
            ConsequenceClass::Other        => 0.20,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsequenceClass::Frameshift   => "frameshift",
            ConsequenceClass::Nonsense     => "nonsense",
            ConsequenceClass::SpliceSite   => "splice_site",
            ConsequenceClass::Missense     => "missense",
            ConsequenceClass::InframeIndel => "inframe_indel",
            ConsequenceClass::Synonymous   => "synonymous",
            ConsequenceClass::Intronic     => "intronic",
            ConsequenceClass::Other        => "other",
        }
    }
}

/// A single tumor mutation. Immutable once constructed; its identity
/// (gene + change + coordinates) keys the sequence-score cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub gene: String,
    pub hgvs_p: Option<String>, // e.g. p.Gly12Asp
    pub hgvs_c: Option<String>, // e.g. c.35G>A
    pub coords: Option<GenomicCoords>,
    pub consequence: ConsequenceClass,
}

impl Variant {
    /// Validating constructor. A variant needs a gene symbol and at
    /// least one of a protein change, a cDNA change, or genomic
    /// coordinates to be scoreable at all.
    pub fn new(
        gene: impl Into<String>,
        hgvs_p: Option<String>,
        hgvs_c: Option<String>,
        coords: Option<GenomicCoords>,
        consequence: ConsequenceClass,
    ) -> Result<Self> {
        let gene = gene.into();
        if gene.trim().is_empty() {
            return Err(OncoselError::InvalidVariant("empty gene symbol".into()));
        }
        if hgvs_p.is_none() && hgvs_c.is_none() && coords.is_none() {
            return Err(OncoselError::InvalidVariant(format!(
                "{gene}: no protein change, cDNA change, or genomic coordinates provided"
            )));
        }
        Ok(Self { gene, hgvs_p, hgvs_c, coords, consequence })
    }

    /// Stable identity string: the most specific change available, e.g.
    /// "BRCA1:p.Gln1756fs", "KRAS:17:43045705:G>A", or "KRAS:c.35G>A".
    pub fn identity(&self) -> String {
        if let Some(p) = &self.hgvs_p {
            format!("{}:{}", self.gene, p)
        } else if let Some(c) = &self.coords {
            format!("{}:{}:{}:{}>{}", self.gene, c.chromosome, c.position, c.reference, c.alternate)
        } else if let Some(c) = &self.hgvs_c {
            format!("{}:{}", self.gene, c)
        } else {
            self.gene.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Drug candidates
// ---------------------------------------------------------------------------

/// Mechanism-of-action class. Drives sporadic-gate rule applicability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoaClass {
    ParpInhibitor,
    ImmuneCheckpoint,
    PlatinumChemo,
    EgfrTki,
    Cdk46Inhibitor,
    AntiAngiogenic,
    Other,
}

impl MoaClass {
    /// Classes whose activity depends on homologous-recombination
    /// deficiency (PARP-penalty gate applies).
    pub fn requires_hrd(&self) -> bool {
        matches!(self, MoaClass::ParpInhibitor | MoaClass::PlatinumChemo)
    }

    /// Classes eligible for the immunotherapy boost gate.
    pub fn is_immune_checkpoint(&self) -> bool {
        matches!(self, MoaClass::ImmuneCheckpoint)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MoaClass::ParpInhibitor    => "parp_inhibitor",
            MoaClass::ImmuneCheckpoint => "immune_checkpoint",
            MoaClass::PlatinumChemo    => "platinum_chemo",
            MoaClass::EgfrTki          => "egfr_tki",
            MoaClass::Cdk46Inhibitor   => "cdk4_6_inhibitor",
            MoaClass::AntiAngiogenic   => "anti_angiogenic",
            MoaClass::Other            => "other",
        }
    }
}

/// A drug from the static panel configuration. Never mutated at
/// request time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugCandidate {
    pub name: String,
    /// Free-text mechanism label used for literature term matching,
    /// e.g. "PARP inhibitor".
    pub moa: String,
    pub moa_class: MoaClass,
    /// pathway id -> relevance weight in [0, 1]
    pub pathway_weights: HashMap<String, f64>,
}

// ---------------------------------------------------------------------------
// Patient / tumor context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GermlineStatus {
    Positive,
    Negative,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MsiStatus {
    High,
    Low,
    Stable,
}

/// Tumor biomarker context. Every field optionally unknown — the
/// sporadic gates distinguish "unknown" from "measured low".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TumorContext {
    /// Tumor mutational burden, mutations per megabase.
    pub tmb: Option<f64>,
    pub msi: Option<MsiStatus>,
    /// Homologous-recombination-deficiency score (0-100 scale).
    pub hrd_score: Option<f64>,
}

impl TumorContext {
    /// Number of expected biomarkers actually present (TMB, MSI, HRD).
    pub fn biomarkers_present(&self) -> usize {
        [self.tmb.is_some(), self.msi.is_some(), self.hrd_score.is_some()]
            .iter()
            .filter(|&&b| b)
            .count()
    }

    /// Fraction of expected biomarkers present, in [0, 1].
    pub fn completeness(&self) -> f64 {
        self.biomarkers_present() as f64 / 3.0
    }
}

// ---------------------------------------------------------------------------
// Tier and badges
// ---------------------------------------------------------------------------

/// Discrete evidence-tier classification, independent of the numeric
/// confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Supported,
    Consider,
    Insufficient,
}

impl Tier {
    /// Ordering rank for ranking ties: higher is stronger.
    pub fn rank(&self) -> u8 {
        match self {
            Tier::Supported    => 2,
            Tier::Consider     => 1,
            Tier::Insufficient => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Supported    => "supported",
            Tier::Consider     => "consider",
            Tier::Insufficient => "insufficient",
        }
    }
}

/// Short categorical quality tag surfaced alongside the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Badge {
    StrongLiterature,
    ModerateLiterature,
    Rct,
    Guideline,
    ClinvarStrong,
    ClinvarModerate,
    ClinvarBenign,
    PathwayAligned,
}

impl Badge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Badge::StrongLiterature   => "StrongLiterature",
            Badge::ModerateLiterature => "ModerateLiterature",
            Badge::Rct                => "RCT",
            Badge::Guideline          => "Guideline",
            Badge::ClinvarStrong      => "ClinVar-Strong",
            Badge::ClinvarModerate    => "ClinVar-Moderate",
            Badge::ClinvarBenign      => "ClinVar-Benign",
            Badge::PathwayAligned     => "PathwayAligned",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
