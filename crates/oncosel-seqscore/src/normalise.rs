//! Disruption normalisation and percentile ranking.
//!
//! Engines report magnitudes in their native, unbounded units; the
//! pipeline consumes values in [0, 1] plus a percentile against a
//! reference population of scored variants.

/// Squash an unbounded disruption magnitude into [0, 1].
/// Saturating map: 0 stays 0, large magnitudes approach 1.
pub fn normalise_disruption(raw: f64) -> f64 {
    1.0 - (-raw.abs()).exp()
}

/// Reference population of raw disruption magnitudes, used for
/// percentile ranks. Deployments can substitute their own cohort.
#[derive(Debug, Clone)]
pub struct ReferenceDistribution {
    sorted: Vec<f64>,
}

impl ReferenceDistribution {
    pub fn new(mut values: Vec<f64>) -> Self {
        values.retain(|v| v.is_finite());
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Self { sorted: values }
    }

    /// Built-in reference: magnitudes spanning benign to severely
    /// disruptive variants, spaced to give a usable spread.
    pub fn builtin() -> Self {
        Self::new(vec![
            0.01, 0.02, 0.05, 0.08, 0.12, 0.18, 0.25, 0.32, 0.40, 0.50,
            0.62, 0.75, 0.90, 1.10, 1.35, 1.60, 1.95, 2.40, 3.00, 4.00,
        ])
    }

    /// Fraction of the reference population strictly below `raw`,
    /// in [0, 1]. An empty reference yields 0.5.
    pub fn percentile(&self, raw: f64) -> f64 {
        if self.sorted.is_empty() {
            return 0.5;
        }
        let below = self.sorted.partition_point(|&v| v < raw.abs());
        below as f64 / self.sorted.len() as f64
    }
}
