//! Persona classification rule catalog.
//!
//! Rules are externally authored, versioned reference data. The engine treats
//! the catalog as immutable for the whole run: it is validated and sorted once
//! here, then only read.

pub mod engine;

use serde::{Deserialize, Serialize};

use crate::domain::customer::Gender;
use crate::errors::DomainError;

pub use engine::{MatchWeights, RuleEngine, RuleMatchResult};

/// Label returned when no rule is eligible for an interaction.
pub const FALLBACK_LABEL: &str = "General/Unclassified";

/// Time constraint for a rule: either an inclusive hour window or a named
/// daypart resolved to its hour range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeConstraint {
    Hours { start: u32, end: u32 },
    Daypart(crate::domain::persona::TimePreference),
}

impl TimeConstraint {
    pub fn contains(&self, hour: u32) -> bool {
        match self {
            TimeConstraint::Hours { start, end } => {
                if start <= end {
                    (*start..=*end).contains(&hour)
                } else {
                    // Window wrapping midnight, e.g. 21..=4.
                    hour >= *start || hour <= *end
                }
            }
            TimeConstraint::Daypart(daypart) => {
                crate::domain::persona::TimePreference::from_hour(hour) == *daypart
            }
        }
    }
}

/// One persona-matching rule. Lower `priority` wins; `id` is the stable
/// final tie-breaker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub id: u32,
    pub label: String,
    pub priority: u32,
    pub include_terms: Vec<String>,
    pub age_min: Option<u32>,
    pub age_max: Option<u32>,
    /// Empty means no gender constraint.
    pub genders: Vec<Gender>,
    pub time_constraint: Option<TimeConstraint>,
    /// Any-of category codes. Empty means the rule does not constrain
    /// purchased categories.
    pub required_categories: Vec<String>,
    pub active: bool,
}

impl ClassificationRule {
    pub fn has_age_constraint(&self) -> bool {
        self.age_min.is_some() || self.age_max.is_some()
    }

    pub fn age_matches(&self, age: Option<u32>) -> bool {
        let Some(age) = age else { return false };
        if !self.has_age_constraint() {
            return false;
        }
        let min_ok = self.age_min.map_or(true, |min| age >= min);
        let max_ok = self.age_max.map_or(true, |max| age <= max);
        min_ok && max_ok
    }
}

/// Validated, immutable rule catalog for one run. Rules are stored in the
/// explicit evaluation order `(priority, id)` so no code path depends on
/// incidental load order.
#[derive(Clone, Debug)]
pub struct RuleCatalog {
    rules: Vec<ClassificationRule>,
}

impl RuleCatalog {
    pub fn new(rules: Vec<ClassificationRule>) -> Result<Self, DomainError> {
        let mut active: Vec<ClassificationRule> =
            rules.into_iter().filter(|rule| rule.active).collect();
        if active.is_empty() {
            return Err(DomainError::MissingReferenceData { catalog: "classification_rules" });
        }

        for rule in &mut active {
            if rule.label.trim().is_empty() {
                return Err(DomainError::InvalidReferenceData(format!(
                    "rule {} has an empty label",
                    rule.id
                )));
            }
            if let (Some(min), Some(max)) = (rule.age_min, rule.age_max) {
                if min > max {
                    return Err(DomainError::InvalidReferenceData(format!(
                        "rule {} has inverted age range {min}..{max}",
                        rule.id
                    )));
                }
            }
            // Substring matching is case-insensitive, fold once at load.
            for term in &mut rule.include_terms {
                *term = term.to_lowercase();
            }
        }

        active.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.id.cmp(&b.id)));
        Ok(Self { rules: active })
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
