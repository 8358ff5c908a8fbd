//! Composite engagement scoring.

use serde::{Deserialize, Serialize};

use super::population::{NormalizedFeatures, FEATURE_COUNT};

/// Fixed weights for the composite score, index-aligned with
/// [`super::population::FEATURE_NAMES`]. Stable across runs and validated to
/// sum to exactly 1.0 so the composite also lives in [0,1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompositeWeights(pub [f64; FEATURE_COUNT]);

impl CompositeWeights {
    pub fn validate(&self) -> bool {
        let total: f64 = self.0.iter().sum();
        (total - 1.0).abs() < 1e-9 && self.0.iter().all(|w| *w >= 0.0)
    }

    pub fn composite_score(&self, features: &NormalizedFeatures) -> f64 {
        self.0.iter().zip(features.0.iter()).map(|(weight, value)| weight * value).sum()
    }
}

impl Default for CompositeWeights {
    fn default() -> Self {
        // transaction_count, avg_value, transaction_frequency, active_days,
        // store_breadth, basket_size, positive_sentiment
        Self([0.25, 0.20, 0.15, 0.15, 0.10, 0.10, 0.05])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        assert!(CompositeWeights::default().validate());
    }

    #[test]
    fn composite_is_monotone_in_each_weighted_feature() {
        let weights = CompositeWeights::default();
        let base = NormalizedFeatures([0.5; FEATURE_COUNT]);
        let base_score = weights.composite_score(&base);

        for index in 0..FEATURE_COUNT {
            let mut raised = base;
            raised.0[index] = 0.9;
            let raised_score = weights.composite_score(&raised);
            assert!(
                raised_score >= base_score,
                "raising feature {index} must not lower the composite"
            );
        }
    }

    #[test]
    fn composite_spans_unit_interval() {
        let weights = CompositeWeights::default();
        assert_eq!(weights.composite_score(&NormalizedFeatures([0.0; FEATURE_COUNT])), 0.0);
        let top = weights.composite_score(&NormalizedFeatures([1.0; FEATURE_COUNT]));
        assert!((top - 1.0).abs() < 1e-9);
    }
}
