//! Weighted rule evaluation.
//!
//! Scoring uses fixed component weights; selection uses the explicit total
//! order `(priority asc, score desc, rule id asc)`. Equal-priority,
//! equal-score candidates therefore always resolve to the same winner across
//! runs.

use serde::{Deserialize, Serialize};

use super::{ClassificationRule, RuleCatalog, FALLBACK_LABEL};
use crate::domain::interaction::Interaction;
use crate::errors::DomainError;

/// Component weights for rule scoring. The five components sum to 1.0 with
/// the full category credit; a rule without a category constraint gets the
/// smaller neutral credit instead.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchWeights {
    pub text: f64,
    pub age: f64,
    pub gender: f64,
    pub time: f64,
    pub category_match: f64,
    pub category_neutral: f64,
}

impl MatchWeights {
    pub fn validate(&self) -> bool {
        let total = self.text + self.age + self.gender + self.time + self.category_match;
        (total - 1.0).abs() < 1e-9 && self.category_neutral < self.category_match
    }
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            text: 0.40,
            age: 0.15,
            gender: 0.10,
            time: 0.15,
            category_match: 0.20,
            category_neutral: 0.10,
        }
    }
}

/// Outcome of evaluating the catalog against one interaction. Computed fresh
/// each run, never persisted as mutable state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleMatchResult {
    pub rule_id: Option<u32>,
    pub label: String,
    pub priority: Option<u32>,
    pub confidence: f64,
    /// A different eligible rule also matched on text.
    pub multi_persona: bool,
}

impl RuleMatchResult {
    pub fn fallback() -> Self {
        Self {
            rule_id: None,
            label: FALLBACK_LABEL.to_string(),
            priority: None,
            confidence: 0.0,
            multi_persona: false,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.rule_id.is_none()
    }
}

struct Candidate<'a> {
    rule: &'a ClassificationRule,
    score: f64,
    text_hit: bool,
}

pub struct RuleEngine {
    catalog: RuleCatalog,
    weights: MatchWeights,
}

impl RuleEngine {
    pub fn new(catalog: RuleCatalog) -> Self {
        Self { catalog, weights: MatchWeights::default() }
    }

    pub fn with_weights(catalog: RuleCatalog, weights: MatchWeights) -> Result<Self, DomainError> {
        if !weights.validate() {
            return Err(DomainError::InvalidReferenceData(
                "match weights must sum to 1.0 with the neutral category credit below the full one"
                    .to_string(),
            ));
        }
        Ok(Self { catalog, weights })
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Evaluate all eligible rules and pick the winner. Falls back to the
    /// default label with zero confidence when nothing is eligible.
    pub fn evaluate(&self, interaction: &Interaction) -> RuleMatchResult {
        let text = interaction.free_text.to_lowercase();

        let mut candidates: Vec<Candidate<'_>> = Vec::new();
        for rule in self.catalog.rules() {
            let text_hit =
                !text.is_empty() && rule.include_terms.iter().any(|term| text.contains(term));
            let age_hit = rule.age_matches(interaction.age);
            let category_hit = !rule.required_categories.is_empty()
                && rule
                    .required_categories
                    .iter()
                    .any(|code| interaction.purchased_categories.iter().any(|c| c == code));

            // Broad pre-filter: any single criterion makes the rule a
            // candidate, the score decides from there.
            if !(text_hit || age_hit || category_hit) {
                continue;
            }

            let score = self.score(rule, interaction, text_hit, age_hit, category_hit);
            candidates.push(Candidate { rule, score, text_hit });
        }

        let Some(winner_index) = select_winner(&candidates) else {
            return RuleMatchResult::fallback();
        };

        let multi_persona = candidates
            .iter()
            .enumerate()
            .any(|(index, candidate)| index != winner_index && candidate.text_hit);

        let winner = &candidates[winner_index];
        RuleMatchResult {
            rule_id: Some(winner.rule.id),
            label: winner.rule.label.clone(),
            priority: Some(winner.rule.priority),
            confidence: winner.score,
            multi_persona,
        }
    }

    fn score(
        &self,
        rule: &ClassificationRule,
        interaction: &Interaction,
        text_hit: bool,
        age_hit: bool,
        category_hit: bool,
    ) -> f64 {
        let mut score = 0.0;

        if text_hit {
            score += self.weights.text;
        }
        if age_hit {
            score += self.weights.age;
        }

        let gender_ok = rule.genders.is_empty()
            || interaction.gender.map_or(false, |gender| rule.genders.contains(&gender));
        if gender_ok {
            score += self.weights.gender;
        }

        let time_ok = rule
            .time_constraint
            .map_or(true, |constraint| constraint.contains(interaction.hour_of_day));
        if time_ok {
            score += self.weights.time;
        }

        if category_hit {
            score += self.weights.category_match;
        } else if rule.required_categories.is_empty() {
            score += self.weights.category_neutral;
        }

        score
    }
}

/// Index of the winning candidate under `(priority, score desc, id)`.
/// Candidates arrive already sorted by `(priority, id)`, so on full ties the
/// first seen (lowest id) is kept.
fn select_winner(candidates: &[Candidate<'_>]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let Some(current) = best else {
            best = Some(index);
            continue;
        };
        let incumbent = &candidates[current];
        let better = match candidate.rule.priority.cmp(&incumbent.rule.priority) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Greater => false,
            std::cmp::Ordering::Equal => candidate.score > incumbent.score,
        };
        if better {
            best = Some(index);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::domain::customer::{CustomerId, Gender};
    use crate::rules::{ClassificationRule, RuleCatalog, TimeConstraint};

    fn rule(id: u32, priority: u32, terms: &[&str]) -> ClassificationRule {
        ClassificationRule {
            id,
            label: format!("Persona {id}"),
            priority,
            include_terms: terms.iter().map(|t| t.to_string()).collect(),
            age_min: None,
            age_max: None,
            genders: vec![],
            time_constraint: None,
            required_categories: vec![],
            active: true,
        }
    }

    fn interaction(text: &str) -> Interaction {
        Interaction {
            customer_id: CustomerId(Uuid::nil()),
            free_text: text.to_string(),
            age: None,
            gender: None,
            hour_of_day: 9,
            purchased_categories: vec![],
        }
    }

    fn engine(rules: Vec<ClassificationRule>) -> RuleEngine {
        RuleEngine::new(RuleCatalog::new(rules).expect("catalog builds"))
    }

    #[test]
    fn default_weights_sum_to_one() {
        assert!(MatchWeights::default().validate());
    }

    #[test]
    fn invalid_match_weights_are_rejected() {
        let catalog = RuleCatalog::new(vec![rule(1, 1, &["kape"])]).expect("catalog builds");
        let lopsided = MatchWeights { text: 0.9, ..MatchWeights::default() };

        let error = RuleEngine::with_weights(catalog, lopsided)
            .err()
            .expect("weights summing past 1.0 must be rejected");
        assert!(matches!(error, crate::errors::DomainError::InvalidReferenceData(_)));
    }

    #[test]
    fn text_match_scores_text_plus_neutral_credits() {
        let engine = engine(vec![rule(1, 1, &["sigarilyo"])]);
        let result = engine.evaluate(&interaction("isang sigarilyo po"));

        assert_eq!(result.rule_id, Some(1));
        // text 0.40 + gender unconstrained 0.10 + time unconstrained 0.15
        // + neutral category 0.10
        assert!((result.confidence - 0.75).abs() < 1e-9);
        assert!(!result.multi_persona);
    }

    #[test]
    fn no_eligible_rule_falls_back_with_zero_confidence() {
        let engine = engine(vec![rule(1, 1, &["sigarilyo"])]);
        let result = engine.evaluate(&interaction("walang tugma dito"));

        assert!(result.is_fallback());
        assert_eq!(result.label, crate::rules::FALLBACK_LABEL);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn lower_priority_beats_higher_score_and_flags_multi_persona() {
        // Scenario D: rule 2 matches on text, age, gender, time, category
        // and outscores rule 1, but rule 1 has the lower priority value.
        let mut strong = rule(2, 5, &["pabili"]);
        strong.age_min = Some(18);
        strong.age_max = Some(60);
        strong.required_categories = vec!["snacks".to_string()];
        let weak = rule(1, 1, &["pabili"]);

        let engine = engine(vec![strong, weak]);
        let mut input = interaction("pabili po ng chichirya");
        input.age = Some(30);
        input.gender = Some(Gender::Female);
        input.purchased_categories = vec!["snacks".to_string()];

        let result = engine.evaluate(&input);
        assert_eq!(result.rule_id, Some(1));
        assert_eq!(result.priority, Some(1));
        assert!(result.multi_persona, "losing text match must set the ambiguity flag");
    }

    #[test]
    fn equal_priority_ties_break_on_score_then_stable_id() {
        // Same priority, same score: the lower rule id must win, on every run.
        let a = rule(11, 3, &["kape"]);
        let b = rule(4, 3, &["kape"]);
        let engine = engine(vec![a, b]);

        for _ in 0..10 {
            let result = engine.evaluate(&interaction("tatlong kape"));
            assert_eq!(result.rule_id, Some(4));
        }
    }

    #[test]
    fn age_only_eligibility_passes_prefilter() {
        let mut by_age = rule(1, 1, &["hindi lalabas sa text"]);
        by_age.age_min = Some(60);
        by_age.age_max = Some(99);

        let engine = engine(vec![by_age]);
        let mut input = interaction("random na usapan");
        input.age = Some(65);

        let result = engine.evaluate(&input);
        assert_eq!(result.rule_id, Some(1));
        // age 0.15 + gender 0.10 + time 0.15 + neutral category 0.10
        assert!((result.confidence - 0.50).abs() < 1e-9);
    }

    #[test]
    fn time_constraint_denies_credit_outside_window() {
        let mut evening = rule(1, 1, &["merienda"]);
        evening.time_constraint = Some(TimeConstraint::Hours { start: 17, end: 20 });

        let engine = engine(vec![evening]);
        let mut input = interaction("merienda muna");
        input.hour_of_day = 9;

        let result = engine.evaluate(&input);
        // text 0.40 + gender 0.10 + neutral category 0.10, no time credit
        assert!((result.confidence - 0.60).abs() < 1e-9);
    }

    #[test]
    fn gender_constraint_requires_known_gender() {
        let mut for_women = rule(1, 1, &["shampoo"]);
        for_women.genders = vec![Gender::Female];

        let engine = engine(vec![for_women]);
        let unknown = engine.evaluate(&interaction("pabili shampoo"));
        let mut input = interaction("pabili shampoo");
        input.gender = Some(Gender::Female);
        let known = engine.evaluate(&input);

        assert!((known.confidence - unknown.confidence - 0.10).abs() < 1e-9);
    }
}
