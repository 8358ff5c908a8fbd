//! Persona label synthesis.
//!
//! An ordered decision table maps tier combinations plus raw demographics to
//! a final label. The first matching row wins; the last row matches
//! everything, so every customer leaves with a label.

use serde::{Deserialize, Serialize};

use crate::domain::customer::Gender;
use crate::domain::persona::{EngagementTier, LoyaltyTier, TimePreference, ValueTier};

/// Inputs to label synthesis for one customer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SynthesisContext {
    pub engagement: EngagementTier,
    pub value: ValueTier,
    pub loyalty: LoyaltyTier,
    pub time: TimePreference,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
}

/// One row of the decision table. `None` fields match anything.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionRow {
    pub label: String,
    pub engagement: Option<EngagementTier>,
    pub value: Option<ValueTier>,
    pub loyalty: Option<LoyaltyTier>,
    pub time: Option<TimePreference>,
    pub min_age: Option<u32>,
    pub gender: Option<Gender>,
}

impl DecisionRow {
    fn matches(&self, ctx: &SynthesisContext) -> bool {
        let engagement_ok = self.engagement.map_or(true, |t| t == ctx.engagement);
        let value_ok = self.value.map_or(true, |t| t == ctx.value);
        let loyalty_ok = self.loyalty.map_or(true, |t| t == ctx.loyalty);
        let time_ok = self.time.map_or(true, |t| t == ctx.time);
        let age_ok = self.min_age.map_or(true, |min| ctx.age.map_or(false, |age| age >= min));
        let gender_ok = self.gender.map_or(true, |g| ctx.gender == Some(g));
        engagement_ok && value_ok && loyalty_ok && time_ok && age_ok && gender_ok
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionTable {
    rows: Vec<DecisionRow>,
}

impl DecisionTable {
    /// Rows are evaluated top to bottom; the final row has no constraints.
    pub fn new(mut rows: Vec<DecisionRow>) -> Self {
        let has_catch_all = rows.iter().any(|row| {
            row.engagement.is_none()
                && row.value.is_none()
                && row.loyalty.is_none()
                && row.time.is_none()
                && row.min_age.is_none()
                && row.gender.is_none()
        });
        if !has_catch_all {
            rows.push(catch_all());
        }
        Self { rows }
    }

    pub fn standard() -> Self {
        let row = |label: &str| DecisionRow {
            label: label.to_string(),
            engagement: None,
            value: None,
            loyalty: None,
            time: None,
            min_age: None,
            gender: None,
        };

        Self::new(vec![
            DecisionRow {
                engagement: Some(EngagementTier::Champion),
                loyalty: Some(LoyaltyTier::SingleStore),
                ..row("Loyal Suki Champion")
            },
            DecisionRow {
                engagement: Some(EngagementTier::Champion),
                value: Some(ValueTier::Premium),
                ..row("Premium Champion")
            },
            DecisionRow {
                engagement: Some(EngagementTier::Champion),
                ..row("Frequent Champion")
            },
            DecisionRow { value: Some(ValueTier::Premium), ..row("Premium Spender") },
            DecisionRow {
                engagement: Some(EngagementTier::Engaged),
                time: Some(TimePreference::EarlyMorning),
                ..row("Early-Morning Regular")
            },
            DecisionRow {
                engagement: Some(EngagementTier::Engaged),
                loyalty: Some(LoyaltyTier::Explorer),
                ..row("Engaged Explorer")
            },
            DecisionRow { engagement: Some(EngagementTier::Engaged), ..row("Engaged Regular") },
            DecisionRow { loyalty: Some(LoyaltyTier::Explorer), ..row("Store Explorer") },
            DecisionRow {
                engagement: Some(EngagementTier::Regular),
                time: Some(TimePreference::Evening),
                ..row("Evening Regular")
            },
            DecisionRow { engagement: Some(EngagementTier::Regular), ..row("Steady Regular") },
            DecisionRow {
                engagement: Some(EngagementTier::Occasional),
                min_age: Some(60),
                ..row("Senior Occasional Shopper")
            },
            DecisionRow {
                engagement: Some(EngagementTier::Occasional),
                ..row("Occasional Shopper")
            },
            DecisionRow { engagement: Some(EngagementTier::Dormant), ..row("Infrequent Shopper") },
        ])
    }

    /// First matching row's label. Total: the catch-all row matches anything.
    pub fn synthesize(&self, ctx: &SynthesisContext) -> &str {
        self.rows
            .iter()
            .find(|row| row.matches(ctx))
            .map(|row| row.label.as_str())
            .unwrap_or("General Shopper")
    }

    pub fn rows(&self) -> &[DecisionRow] {
        &self.rows
    }
}

impl Default for DecisionTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn catch_all() -> DecisionRow {
    DecisionRow {
        label: "General Shopper".to_string(),
        engagement: None,
        value: None,
        loyalty: None,
        time: None,
        min_age: None,
        gender: None,
    }
}
