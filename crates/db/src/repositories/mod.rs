use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use suki_core::domain::customer::{CustomerId, TransactionRecord};
use suki_core::domain::interaction::Interaction;
use suki_core::domain::item::LineItem;
use suki_core::domain::persona::PersonaAssignment;
use suki_core::rules::ClassificationRule;
use suki_core::segmentation::CustomerBehaviorProfile;
use suki_core::taxonomy::{BrandMapping, SkuMapping};

pub mod assignments;
pub mod memory;
pub mod observations;
pub mod rules;
pub mod taxonomy;

pub use assignments::SqlAssignmentRepository;
pub use memory::{
    InMemoryAssignmentRepository, InMemoryObservationRepository, InMemoryRuleRepository,
    InMemoryTaxonomyRepository,
};
pub use observations::SqlObservationRepository;
pub use rules::SqlRuleRepository;
pub use taxonomy::SqlTaxonomyRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(error: serde_json::Error) -> Self {
        RepositoryError::Decode(error.to_string())
    }
}

/// Row counts the readiness checks look at before a batch run is allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferenceCounts {
    pub brand_mappings: u64,
    pub active_rules: u64,
}

pub async fn reference_counts(pool: &crate::DbPool) -> Result<ReferenceCounts, RepositoryError> {
    use sqlx::Row;

    let brand_mappings = sqlx::query("SELECT COUNT(*) AS count FROM product_mappings")
        .fetch_one(pool)
        .await?
        .get::<i64, _>("count")
        .max(0) as u64;
    let active_rules =
        sqlx::query("SELECT COUNT(*) AS count FROM classification_rules WHERE active = 1")
            .fetch_one(pool)
            .await?
            .get::<i64, _>("count")
            .max(0) as u64;

    Ok(ReferenceCounts { brand_mappings, active_rules })
}

/// Brand and SKU category mappings. `replace_mappings` swaps the whole
/// dictionary in one transaction; a rebuild never leaves a half-written
/// taxonomy visible.
#[async_trait]
pub trait TaxonomyRepository: Send + Sync {
    async fn load_brand_mappings(&self) -> Result<Vec<BrandMapping>, RepositoryError>;
    async fn load_sku_mappings(&self) -> Result<Vec<SkuMapping>, RepositoryError>;
    async fn replace_mappings(
        &self,
        brands: Vec<BrandMapping>,
        skus: Vec<SkuMapping>,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// All rules, active and inactive. Catalog construction filters.
    async fn load_rules(&self) -> Result<Vec<ClassificationRule>, RepositoryError>;
    async fn save_rules(&self, rules: Vec<ClassificationRule>) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ObservationRepository: Send + Sync {
    async fn load_line_items(&self) -> Result<Vec<LineItem>, RepositoryError>;
    async fn load_interactions(&self) -> Result<Vec<Interaction>, RepositoryError>;
    async fn load_transactions_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>, RepositoryError>;
    async fn record_line_item(&self, item: LineItem) -> Result<(), RepositoryError>;
    async fn record_interaction(&self, interaction: Interaction) -> Result<(), RepositoryError>;
    async fn record_transaction(&self, record: TransactionRecord) -> Result<(), RepositoryError>;
}

/// Persisted batch output. A run replaces the previous run's rows entirely.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    async fn replace_run_output(
        &self,
        run_id: Uuid,
        profiles: &[CustomerBehaviorProfile],
        assignments: &[PersonaAssignment],
    ) -> Result<(), RepositoryError>;

    async fn find_assignment(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<PersonaAssignment>, RepositoryError>;

    async fn label_counts(&self) -> Result<Vec<(String, u64)>, RepositoryError>;
}
