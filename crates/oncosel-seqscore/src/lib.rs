//! oncosel-seqscore — Sequence-disruption scoring.
//!
//! Invokes an external variant-scoring backend through an ordered
//! engine fallback ladder (remote primary, adaptive-window ensemble,
//! consequence-class heuristic), with a TTL'd single-flight cache so
//! concurrent identical requests share one external call.

pub mod engine;
pub mod remote;
pub mod ensemble;
pub mod cache;
pub mod scorer;
pub mod normalise;

pub use cache::{CacheKey, CacheStats, ScoreCache};
pub use engine::{EngineScore, HeuristicEngine, ScoringEngine};
pub use scorer::{SequenceScore, SequenceScorer};
