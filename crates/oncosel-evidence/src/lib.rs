//! oncosel-evidence — External evidence lookups.
//!
//! Literature-index scoring, curated-variant-database priors, and the
//! four-endpoint auxiliary insights bundle. Every call is timeout
//! bounded; failure degrades to a zero-strength result recorded in
//! provenance, never an error to the caller — evidence absence is a
//! valid, scoreable state.

pub mod literature;
pub mod clinvar;
pub mod insights;
pub mod synonyms;

pub use clinvar::{ClinvarPrior, ClinvarRecord, CuratedVariantDb, ReviewStatus};
pub use insights::{InsightEndpoint, InsightsBundle, InsightsClient, InsightsProvider};
pub use literature::{EvidenceHit, LiteratureDoc, LiteratureIndex, LiteratureScorer};
