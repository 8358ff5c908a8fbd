//! Quintile assignment over the composite-score distribution.

use serde::{Deserialize, Serialize};

use crate::domain::persona::EngagementTier;

/// Phase-2 reduction over all composite scores in the batch. Assignment is
/// rank-based: a customer's tier depends on the fraction of the population
/// scoring strictly below them, so tied scores always share a tier and the
/// result does not depend on input order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuintileAssigner {
    sorted_scores: Vec<f64>,
}

impl QuintileAssigner {
    pub fn from_scores(mut scores: Vec<f64>) -> Self {
        scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Self { sorted_scores: scores }
    }

    pub fn population_size(&self) -> usize {
        self.sorted_scores.len()
    }

    /// Tier for a composite score, highest engagement first. An empty
    /// population (or a population of one) lands in the lowest tier.
    pub fn tier_for(&self, score: f64) -> EngagementTier {
        let n = self.sorted_scores.len();
        if n == 0 {
            return EngagementTier::Dormant;
        }

        let below = self.sorted_scores.partition_point(|s| *s < score);
        let fraction = below as f64 / n as f64;

        if fraction < 0.2 {
            EngagementTier::Dormant
        } else if fraction < 0.4 {
            EngagementTier::Occasional
        } else if fraction < 0.6 {
            EngagementTier::Regular
        } else if fraction < 0.8 {
            EngagementTier::Engaged
        } else {
            EngagementTier::Champion
        }
    }
}
