//! Population-relative feature normalization.
//!
//! Every numeric feature is min-max scaled to [0,1] against the bounds
//! observed in the current batch. The same absolute behavior can therefore
//! land in different tiers across runs when the population shifts; callers
//! who need reproducible tier boundaries can pin [`PopulationBounds`] from a
//! reference sample instead of deriving them per batch.

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::features::CustomerBehaviorProfile;

/// Number of features entering the composite score.
pub const FEATURE_COUNT: usize = 7;

/// Feature names, index-aligned with [`FeatureVector`].
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "transaction_count",
    "avg_value",
    "transaction_frequency",
    "active_days",
    "store_breadth",
    "basket_size",
    "positive_sentiment",
];

/// Raw composite-score inputs for one customer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn from_profile(profile: &CustomerBehaviorProfile) -> Self {
        Self([
            profile.transaction_count as f64,
            profile.avg_value.to_f64().unwrap_or(0.0),
            profile.transaction_frequency,
            profile.active_days as f64,
            profile.store_count as f64,
            profile.avg_basket_size,
            profile.positive_ratio,
        ])
    }
}

/// Normalized features, every component guaranteed in [0,1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFeatures(pub [f64; FEATURE_COUNT]);

/// Per-feature min/max bounds. Usually derived from the batch population in
/// phase 2; can also be fixed from a reference sample for run-over-run
/// stability.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulationBounds {
    min: [f64; FEATURE_COUNT],
    max: [f64; FEATURE_COUNT],
}

impl PopulationBounds {
    /// Derive bounds from every customer in the batch. This is the phase-2
    /// barrier: it must see the full population before any normalization.
    pub fn from_population<'a>(vectors: impl IntoIterator<Item = &'a FeatureVector>) -> Self {
        let mut min = [f64::INFINITY; FEATURE_COUNT];
        let mut max = [f64::NEG_INFINITY; FEATURE_COUNT];

        let mut seen = false;
        for vector in vectors {
            seen = true;
            for index in 0..FEATURE_COUNT {
                min[index] = min[index].min(vector.0[index]);
                max[index] = max[index].max(vector.0[index]);
            }
        }

        if !seen {
            return Self { min: [0.0; FEATURE_COUNT], max: [0.0; FEATURE_COUNT] };
        }

        Self { min, max }
    }

    /// Fixed bounds from a reference sample.
    pub fn fixed(min: [f64; FEATURE_COUNT], max: [f64; FEATURE_COUNT]) -> Self {
        Self { min, max }
    }

    /// Min-max scale a vector against these bounds. A degenerate feature
    /// (min == max across the population) normalizes to 0.0; out-of-bounds
    /// values under fixed bounds clamp into [0,1].
    pub fn normalize(&self, vector: &FeatureVector) -> NormalizedFeatures {
        let mut scaled = [0.0; FEATURE_COUNT];
        for index in 0..FEATURE_COUNT {
            let range = self.max[index] - self.min[index];
            if range > 0.0 {
                scaled[index] = ((vector.0[index] - self.min[index]) / range).clamp(0.0, 1.0);
            }
        }
        NormalizedFeatures(scaled)
    }
}
