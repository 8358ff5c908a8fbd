use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::customer::CustomerId;

/// Quintile tier over the composite engagement score, highest to lowest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementTier {
    Champion,
    Engaged,
    Regular,
    Occasional,
    Dormant,
}

impl EngagementTier {
    pub fn label(&self) -> &'static str {
        match self {
            EngagementTier::Champion => "Champion",
            EngagementTier::Engaged => "Engaged",
            EngagementTier::Regular => "Regular",
            EngagementTier::Occasional => "Occasional",
            EngagementTier::Dormant => "Dormant",
        }
    }
}

/// Value tier from absolute average spend per transaction. Thresholds are
/// fixed currency amounts, deliberately not population-relative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTier {
    Premium,
    High,
    Standard,
    Budget,
    Economy,
}

impl ValueTier {
    pub fn from_avg_spend(avg: Decimal) -> Self {
        if avg >= Decimal::new(500, 0) {
            ValueTier::Premium
        } else if avg >= Decimal::new(200, 0) {
            ValueTier::High
        } else if avg >= Decimal::new(100, 0) {
            ValueTier::Standard
        } else if avg >= Decimal::new(50, 0) {
            ValueTier::Budget
        } else {
            ValueTier::Economy
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ValueTier::Premium => "Premium",
            ValueTier::High => "High-Value",
            ValueTier::Standard => "Standard",
            ValueTier::Budget => "Budget",
            ValueTier::Economy => "Economy",
        }
    }
}

/// Loyalty tier from store-visit concentration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoyaltyTier {
    SingleStore,
    MultiStore,
    Explorer,
}

impl LoyaltyTier {
    pub fn from_store_count(stores: u32) -> Self {
        match stores {
            0 | 1 => LoyaltyTier::SingleStore,
            2..=3 => LoyaltyTier::MultiStore,
            _ => LoyaltyTier::Explorer,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoyaltyTier::SingleStore => "Loyalist",
            LoyaltyTier::MultiStore => "Multi-Store",
            LoyaltyTier::Explorer => "Explorer",
        }
    }
}

/// Dominant time-of-day bucket for a customer's transactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePreference {
    EarlyMorning,
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimePreference {
    pub const ALL: [TimePreference; 5] = [
        TimePreference::EarlyMorning,
        TimePreference::Morning,
        TimePreference::Afternoon,
        TimePreference::Evening,
        TimePreference::Night,
    ];

    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=7 => TimePreference::EarlyMorning,
            8..=11 => TimePreference::Morning,
            12..=16 => TimePreference::Afternoon,
            17..=20 => TimePreference::Evening,
            _ => TimePreference::Night,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimePreference::EarlyMorning => "Early-Morning",
            TimePreference::Morning => "Morning",
            TimePreference::Afternoon => "Afternoon",
            TimePreference::Evening => "Evening",
            TimePreference::Night => "Night",
        }
    }
}

/// Confidence in a persona assignment, a step function of how much history
/// backs it: at least 10 transactions across 7 active days earns the highest
/// tier, a single observed transaction the lowest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Minimal,
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn from_activity(transaction_count: u32, active_days: u32) -> Self {
        if transaction_count >= 10 && active_days >= 7 {
            ConfidenceLevel::High
        } else if transaction_count >= 5 && active_days >= 3 {
            ConfidenceLevel::Medium
        } else if transaction_count >= 2 {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::Minimal
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            ConfidenceLevel::High => 0.9,
            ConfidenceLevel::Medium => 0.7,
            ConfidenceLevel::Low => 0.5,
            ConfidenceLevel::Minimal => 0.3,
        }
    }
}

/// Final persona for a customer, full-replaced each batch run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonaAssignment {
    pub customer_id: CustomerId,
    pub label: String,
    pub confidence: f64,
    pub engagement_tier: EngagementTier,
    pub value_tier: ValueTier,
    pub loyalty_tier: LoyaltyTier,
    pub time_preference: TimePreference,
    /// Set when a different eligible rule also matched on text.
    pub multi_persona: bool,
}
