use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use suki_core::domain::customer::{CustomerId, TransactionRecord};
use suki_core::domain::interaction::Interaction;
use suki_core::domain::item::LineItem;
use suki_core::domain::persona::PersonaAssignment;
use suki_core::rules::ClassificationRule;
use suki_core::segmentation::CustomerBehaviorProfile;
use suki_core::taxonomy::{BrandMapping, SkuMapping};

use super::{
    AssignmentRepository, ObservationRepository, RepositoryError, RuleRepository,
    TaxonomyRepository,
};

#[derive(Default)]
pub struct InMemoryTaxonomyRepository {
    mappings: RwLock<(Vec<BrandMapping>, Vec<SkuMapping>)>,
}

#[async_trait::async_trait]
impl TaxonomyRepository for InMemoryTaxonomyRepository {
    async fn load_brand_mappings(&self) -> Result<Vec<BrandMapping>, RepositoryError> {
        Ok(self.mappings.read().await.0.clone())
    }

    async fn load_sku_mappings(&self) -> Result<Vec<SkuMapping>, RepositoryError> {
        Ok(self.mappings.read().await.1.clone())
    }

    async fn replace_mappings(
        &self,
        brands: Vec<BrandMapping>,
        skus: Vec<SkuMapping>,
    ) -> Result<(), RepositoryError> {
        *self.mappings.write().await = (brands, skus);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryRuleRepository {
    rules: RwLock<HashMap<u32, ClassificationRule>>,
}

#[async_trait::async_trait]
impl RuleRepository for InMemoryRuleRepository {
    async fn load_rules(&self) -> Result<Vec<ClassificationRule>, RepositoryError> {
        let rules = self.rules.read().await;
        let mut all: Vec<ClassificationRule> = rules.values().cloned().collect();
        all.sort_by_key(|rule| (rule.priority, rule.id));
        Ok(all)
    }

    async fn save_rules(&self, rules: Vec<ClassificationRule>) -> Result<(), RepositoryError> {
        let mut stored = self.rules.write().await;
        for rule in rules {
            stored.insert(rule.id, rule);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryObservationRepository {
    line_items: RwLock<Vec<LineItem>>,
    interactions: RwLock<Vec<Interaction>>,
    transactions: RwLock<Vec<TransactionRecord>>,
}

#[async_trait::async_trait]
impl ObservationRepository for InMemoryObservationRepository {
    async fn load_line_items(&self) -> Result<Vec<LineItem>, RepositoryError> {
        Ok(self.line_items.read().await.clone())
    }

    async fn load_interactions(&self) -> Result<Vec<Interaction>, RepositoryError> {
        Ok(self.interactions.read().await.clone())
    }

    async fn load_transactions_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>, RepositoryError> {
        Ok(self
            .transactions
            .read()
            .await
            .iter()
            .filter(|record| record.occurred_at >= cutoff)
            .cloned()
            .collect())
    }

    async fn record_line_item(&self, item: LineItem) -> Result<(), RepositoryError> {
        self.line_items.write().await.push(item);
        Ok(())
    }

    async fn record_interaction(&self, interaction: Interaction) -> Result<(), RepositoryError> {
        self.interactions.write().await.push(interaction);
        Ok(())
    }

    async fn record_transaction(&self, record: TransactionRecord) -> Result<(), RepositoryError> {
        self.transactions.write().await.push(record);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAssignmentRepository {
    state: RwLock<InMemoryAssignmentState>,
}

#[derive(Default)]
struct InMemoryAssignmentState {
    profiles: HashMap<CustomerId, CustomerBehaviorProfile>,
    assignments: HashMap<CustomerId, PersonaAssignment>,
}

#[async_trait::async_trait]
impl AssignmentRepository for InMemoryAssignmentRepository {
    async fn replace_run_output(
        &self,
        _run_id: Uuid,
        profiles: &[CustomerBehaviorProfile],
        assignments: &[PersonaAssignment],
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.profiles =
            profiles.iter().map(|p| (p.customer_id.clone(), p.clone())).collect();
        state.assignments =
            assignments.iter().map(|a| (a.customer_id.clone(), a.clone())).collect();
        Ok(())
    }

    async fn find_assignment(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<PersonaAssignment>, RepositoryError> {
        Ok(self.state.read().await.assignments.get(customer_id).cloned())
    }

    async fn label_counts(&self) -> Result<Vec<(String, u64)>, RepositoryError> {
        let state = self.state.read().await;
        let mut counts: HashMap<String, u64> = HashMap::new();
        for assignment in state.assignments.values() {
            *counts.entry(assignment.label.clone()).or_insert(0) += 1;
        }
        let mut counts: Vec<(String, u64)> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(counts)
    }
}
