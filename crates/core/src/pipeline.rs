//! Three-phase batch pipeline.
//!
//! Phase 1 resolves line items and extracts per-customer features (entities
//! are independent). Phase 2 is the barrier: population bounds and quintile
//! ranks need every customer before anyone can be normalized. Phase 3 applies
//! normalization, composite scoring, rule evaluation, and persona synthesis
//! against the immutable phase-2 statistics.
//!
//! The run is a pure function of its inputs; output fully replaces the prior
//! run's output, so recovery from partial failure is re-running the batch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::domain::customer::{CustomerId, Gender, TransactionRecord};
use crate::domain::interaction::Interaction;
use crate::domain::item::{LineItem, ResolvedCategory};
use crate::domain::persona::PersonaAssignment;
use crate::rules::{RuleCatalog, RuleEngine, RuleMatchResult};
use crate::segmentation::{
    extract_profile, CustomerBehaviorProfile, FeatureVector, PopulationBounds, QuintileAssigner,
    SegmentationEngine,
};
use crate::taxonomy::{CoverageStats, TaxonomyDictionary};

/// Everything a batch run reads. The host process assembles this from the
/// observation tables; the pipeline itself performs no I/O.
#[derive(Clone, Debug, Default)]
pub struct BatchInput {
    pub line_items: Vec<LineItem>,
    pub interactions: Vec<Interaction>,
    pub transactions: Vec<TransactionRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedItem {
    pub item: LineItem,
    pub category: ResolvedCategory,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchOutput {
    pub run_id: Uuid,
    pub items: Vec<ClassifiedItem>,
    pub profiles: Vec<CustomerBehaviorProfile>,
    pub assignments: Vec<PersonaAssignment>,
    pub coverage: CoverageStats,
}

/// Immutable per-run engine bundle. Reference data is validated at
/// construction, which is where missing prerequisites abort the run.
pub struct BatchRunner {
    taxonomy: TaxonomyDictionary,
    rules: RuleEngine,
    segmentation: SegmentationEngine,
}

impl BatchRunner {
    pub fn new(taxonomy: TaxonomyDictionary, catalog: RuleCatalog) -> Self {
        Self {
            taxonomy,
            rules: RuleEngine::new(catalog),
            segmentation: SegmentationEngine::new(),
        }
    }

    pub fn with_segmentation(
        taxonomy: TaxonomyDictionary,
        catalog: RuleCatalog,
        segmentation: SegmentationEngine,
    ) -> Self {
        Self { taxonomy, rules: RuleEngine::new(catalog), segmentation }
    }

    pub fn taxonomy(&self) -> &TaxonomyDictionary {
        &self.taxonomy
    }

    pub fn run(&self, input: BatchInput) -> BatchOutput {
        let run_id = Uuid::new_v4();
        info!(
            event_name = "batch.run.start",
            run_id = %run_id,
            line_items = input.line_items.len(),
            interactions = input.interactions.len(),
            transactions = input.transactions.len(),
            "starting batch run"
        );

        // Phase 1: independent per-entity maps.
        let items: Vec<ClassifiedItem> = input
            .line_items
            .into_iter()
            .map(|item| {
                let category = self.taxonomy.resolve(&item);
                ClassifiedItem { item, category }
            })
            .collect();

        let mut histories: BTreeMap<CustomerId, Vec<TransactionRecord>> = BTreeMap::new();
        for record in input.transactions {
            histories.entry(record.customer_id.clone()).or_default().push(record);
        }
        let mut interactions: BTreeMap<CustomerId, Vec<Interaction>> = BTreeMap::new();
        for interaction in input.interactions {
            interactions.entry(interaction.customer_id.clone()).or_default().push(interaction);
        }
        // Every customer seen in either source gets an assignment.
        for customer_id in interactions.keys() {
            histories.entry(customer_id.clone()).or_default();
        }

        let profiles: Vec<CustomerBehaviorProfile> = histories
            .iter()
            .map(|(customer_id, records)| extract_profile(customer_id.clone(), records))
            .collect();

        info!(
            event_name = "batch.phase1.complete",
            run_id = %run_id,
            resolved_items = items.len(),
            customers = profiles.len(),
            "per-entity extraction complete"
        );

        // Phase 2: population-wide reduction. Nothing downstream may start
        // until every customer has been folded in.
        let vectors: Vec<FeatureVector> =
            profiles.iter().map(FeatureVector::from_profile).collect();
        let bounds = PopulationBounds::from_population(&vectors);
        let scores: Vec<f64> = vectors
            .iter()
            .map(|vector| self.segmentation.weights().composite_score(&bounds.normalize(vector)))
            .collect();
        let quintiles = QuintileAssigner::from_scores(scores);

        info!(
            event_name = "batch.phase2.complete",
            run_id = %run_id,
            population = quintiles.population_size(),
            "population statistics computed"
        );

        // Phase 3: apply per entity against the frozen statistics.
        let assignments: Vec<PersonaAssignment> = profiles
            .iter()
            .map(|profile| {
                let customer_interactions = interactions
                    .get(&profile.customer_id)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                self.assign(profile, customer_interactions, &bounds, &quintiles)
            })
            .collect();

        let coverage = self.taxonomy.coverage();
        info!(
            event_name = "batch.run.complete",
            run_id = %run_id,
            assignments = assignments.len(),
            mapped_items = coverage.mapped,
            unmapped_items = coverage.unmapped,
            "batch run complete"
        );

        BatchOutput { run_id, items, profiles, assignments, coverage }
    }

    fn assign(
        &self,
        profile: &CustomerBehaviorProfile,
        customer_interactions: &[Interaction],
        bounds: &PopulationBounds,
        quintiles: &QuintileAssigner,
    ) -> PersonaAssignment {
        let rule_match = self.best_rule_match(customer_interactions);
        let (age, gender) = demographics(customer_interactions);

        let segment = self.segmentation.segment(profile, bounds, quintiles, age, gender);

        // A curated rule match supersedes the synthesized behavioral label;
        // tier dimensions always come from segmentation.
        let (label, confidence, multi_persona) = match &rule_match {
            Some(matched) if !matched.is_fallback() => {
                (matched.label.clone(), matched.confidence, matched.multi_persona)
            }
            _ => (segment.label.clone(), segment.confidence.score(), false),
        };

        PersonaAssignment {
            customer_id: profile.customer_id.clone(),
            label,
            confidence,
            engagement_tier: segment.engagement,
            value_tier: segment.value,
            loyalty_tier: segment.loyalty,
            time_preference: segment.time,
            multi_persona,
        }
    }

    /// Best rule outcome across a customer's interactions under the same
    /// explicit order the engine uses per interaction.
    fn best_rule_match(&self, customer_interactions: &[Interaction]) -> Option<RuleMatchResult> {
        let mut best: Option<RuleMatchResult> = None;
        for interaction in customer_interactions {
            let result = self.rules.evaluate(interaction);
            let better = match &best {
                None => true,
                Some(current) => match (result.priority, current.priority) {
                    (Some(_), None) => true,
                    (None, Some(_)) | (None, None) => false,
                    (Some(a), Some(b)) => {
                        a < b
                            || (a == b && result.confidence > current.confidence)
                            || (a == b
                                && result.confidence == current.confidence
                                && result.rule_id < current.rule_id)
                    }
                },
            };
            if better {
                best = Some(result);
            }
        }
        best
    }
}

fn demographics(customer_interactions: &[Interaction]) -> (Option<u32>, Option<Gender>) {
    let age = customer_interactions.iter().find_map(|i| i.age);
    let gender = customer_interactions.iter().find_map(|i| i.gender);
    (age, gender)
}
