//! Behavioral segmentation over a customer's transaction history.
//!
//! Stateless batch transform: extract features per customer, normalize them
//! against the batch population, combine into a composite score, then derive
//! independent tier dimensions and synthesize a persona label.

pub mod features;
pub mod population;
pub mod scoring;
pub mod synthesis;
pub mod tiers;

use serde::{Deserialize, Serialize};

use crate::domain::customer::Gender;
use crate::domain::persona::{
    ConfidenceLevel, EngagementTier, LoyaltyTier, TimePreference, ValueTier,
};
use crate::errors::DomainError;

pub use features::{extract_profile, CustomerBehaviorProfile};
pub use population::{FeatureVector, NormalizedFeatures, PopulationBounds};
pub use scoring::CompositeWeights;
pub use synthesis::{DecisionRow, DecisionTable, SynthesisContext};
pub use tiers::QuintileAssigner;

/// Fully derived segmentation output for one customer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BehavioralSegment {
    pub composite_score: f64,
    pub engagement: EngagementTier,
    pub value: ValueTier,
    pub loyalty: LoyaltyTier,
    pub time: TimePreference,
    pub confidence: ConfidenceLevel,
    pub label: String,
}

pub struct SegmentationEngine {
    weights: CompositeWeights,
    table: DecisionTable,
}

impl SegmentationEngine {
    pub fn new() -> Self {
        Self { weights: CompositeWeights::default(), table: DecisionTable::standard() }
    }

    pub fn with_parts(
        weights: CompositeWeights,
        table: DecisionTable,
    ) -> Result<Self, DomainError> {
        if !weights.validate() {
            return Err(DomainError::InvalidReferenceData(
                "composite weights must be non-negative and sum to 1.0".to_string(),
            ));
        }
        Ok(Self { weights, table })
    }

    pub fn weights(&self) -> &CompositeWeights {
        &self.weights
    }

    /// Phase-3 application for one customer, given the phase-2 population
    /// statistics. Pure: identical inputs always produce identical output.
    pub fn segment(
        &self,
        profile: &CustomerBehaviorProfile,
        bounds: &PopulationBounds,
        quintiles: &QuintileAssigner,
        age: Option<u32>,
        gender: Option<Gender>,
    ) -> BehavioralSegment {
        let vector = FeatureVector::from_profile(profile);
        let normalized = bounds.normalize(&vector);
        let composite_score = self.weights.composite_score(&normalized);

        let engagement = quintiles.tier_for(composite_score);
        let value = ValueTier::from_avg_spend(profile.avg_value);
        let loyalty = LoyaltyTier::from_store_count(profile.store_count);
        let time = profile.dominant_time();
        let confidence =
            ConfidenceLevel::from_activity(profile.transaction_count, profile.active_days);

        let label = self
            .table
            .synthesize(&SynthesisContext { engagement, value, loyalty, time, age, gender })
            .to_string();

        BehavioralSegment { composite_score, engagement, value, loyalty, time, confidence, label }
    }
}

impl Default for SegmentationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::*;
    use crate::domain::customer::{CustomerId, Sentiment, StoreId, TransactionRecord};

    fn record(day: u32, hour: u32, store: &str, value: i64) -> TransactionRecord {
        TransactionRecord {
            customer_id: CustomerId(Uuid::nil()),
            store_id: StoreId(store.to_string()),
            occurred_at: Utc.with_ymd_and_hms(2026, 7, day, hour, 0, 0).unwrap(),
            total_value: Decimal::new(value, 2),
            item_count: 3,
            substitution_accepted: false,
            conversation_length: 10,
            sentiment: Sentiment::Neutral,
        }
    }

    #[test]
    fn minimal_customer_gets_valid_lowest_tier_assignment() {
        // Scenario B: one weekday-morning transaction, one store, no text.
        // 2026-07-06 is a Monday.
        let minimal_history = vec![record(6, 9, "S-1", 4500)];
        let busy_history: Vec<TransactionRecord> =
            (1..=20).map(|day| record(day, 18, &format!("S-{}", day % 4), 35000)).collect();

        let engine = SegmentationEngine::new();
        let minimal = extract_profile(CustomerId(Uuid::nil()), &minimal_history);
        let busy = extract_profile(CustomerId(Uuid::nil()), &busy_history);

        let vectors = [FeatureVector::from_profile(&minimal), FeatureVector::from_profile(&busy)];
        let bounds = PopulationBounds::from_population(&vectors);
        let weights = CompositeWeights::default();
        let quintiles = QuintileAssigner::from_scores(
            vectors.iter().map(|v| weights.composite_score(&bounds.normalize(v))).collect(),
        );

        let segment = engine.segment(&minimal, &bounds, &quintiles, None, None);

        assert!((0.0..=1.0).contains(&segment.composite_score));
        assert_eq!(segment.engagement, crate::domain::persona::EngagementTier::Dormant);
        assert_eq!(segment.confidence, ConfidenceLevel::Minimal);
        assert!(!segment.label.is_empty(), "even a minimal customer gets a persona label");
    }

    #[test]
    fn segmentation_is_deterministic() {
        let history: Vec<TransactionRecord> =
            (1..=12).map(|day| record(day, 7, "S-1", 52000)).collect();
        let profile = extract_profile(CustomerId(Uuid::nil()), &history);
        let vector = FeatureVector::from_profile(&profile);
        let bounds = PopulationBounds::from_population(&[vector]);
        let quintiles = QuintileAssigner::from_scores(vec![0.0]);

        let engine = SegmentationEngine::new();
        let first = engine.segment(&profile, &bounds, &quintiles, Some(35), None);
        let second = engine.segment(&profile, &bounds, &quintiles, Some(35), None);
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_weights_are_rejected() {
        let bad = CompositeWeights([0.5; population::FEATURE_COUNT]);
        let error = SegmentationEngine::with_parts(bad, DecisionTable::standard())
            .err()
            .expect("weights summing past 1.0 must be rejected");
        assert!(matches!(error, DomainError::InvalidReferenceData(_)));
    }
}
