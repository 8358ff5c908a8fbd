//! Deterministic seed dataset for local development and end-to-end checks.
//!
//! Seeds a small sari-sari taxonomy, a starter rule catalog, and a month of
//! observations for a handful of customers, enough to exercise every stage of
//! a batch run.

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use suki_core::domain::customer::{CustomerId, Gender, Sentiment, StoreId, TransactionRecord};
use suki_core::domain::interaction::Interaction;
use suki_core::domain::item::LineItem;
use suki_core::domain::persona::TimePreference;
use suki_core::rules::{ClassificationRule, TimeConstraint};
use suki_core::taxonomy::{BrandMapping, CategoryRef, SkuMapping};

use crate::repositories::{
    ObservationRepository, RepositoryError, RuleRepository, SqlObservationRepository,
    SqlRuleRepository, SqlTaxonomyRepository, TaxonomyRepository,
};
use crate::DbPool;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub brand_mappings: usize,
    pub sku_mappings: usize,
    pub rules: usize,
    pub line_items: usize,
    pub interactions: usize,
    pub transactions: usize,
}

pub struct SeedDataset {
    pub brands: Vec<BrandMapping>,
    pub skus: Vec<SkuMapping>,
    pub rules: Vec<ClassificationRule>,
    pub line_items: Vec<LineItem>,
    pub interactions: Vec<Interaction>,
    pub transactions: Vec<TransactionRecord>,
}

impl SeedDataset {
    pub fn standard() -> Self {
        Self {
            brands: seed_brands(),
            skus: seed_skus(),
            rules: seed_rules(),
            line_items: seed_line_items(),
            interactions: seed_interactions(),
            transactions: seed_transactions(),
        }
    }

    /// Write the dataset through the SQL repositories. Taxonomy is replaced
    /// wholesale; observations append, so callers seed a fresh database.
    pub async fn apply(self, pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let result = SeedResult {
            brand_mappings: self.brands.len(),
            sku_mappings: self.skus.len(),
            rules: self.rules.len(),
            line_items: self.line_items.len(),
            interactions: self.interactions.len(),
            transactions: self.transactions.len(),
        };

        let taxonomy = SqlTaxonomyRepository::new(pool.clone());
        taxonomy.replace_mappings(self.brands, self.skus).await?;

        let rules = SqlRuleRepository::new(pool.clone());
        rules.save_rules(self.rules).await?;

        let observations = SqlObservationRepository::new(pool.clone());
        for item in self.line_items {
            observations.record_line_item(item).await?;
        }
        for interaction in self.interactions {
            observations.record_interaction(interaction).await?;
        }
        for record in self.transactions {
            observations.record_transaction(record).await?;
        }

        Ok(result)
    }
}

fn category(code: &str, name: &str, department: &str) -> CategoryRef {
    CategoryRef {
        category_code: code.to_string(),
        category_name: name.to_string(),
        department_code: department.to_string(),
    }
}

fn seed_brands() -> Vec<BrandMapping> {
    vec![
        BrandMapping {
            brand_key: "Alaska".to_string(),
            category: category("dairy", "Dairy", "D-02"),
            usage_count: 412,
        },
        BrandMapping {
            brand_key: "Lucky Me".to_string(),
            category: category("instant-noodles", "Instant Noodles", "D-01"),
            usage_count: 388,
        },
        BrandMapping {
            brand_key: "Surf".to_string(),
            category: category("laundry", "Laundry Care", "D-04"),
            usage_count: 201,
        },
        BrandMapping {
            brand_key: "Kopiko".to_string(),
            category: category("coffee", "Coffee", "D-01"),
            usage_count: 176,
        },
        BrandMapping {
            brand_key: "Pampers".to_string(),
            category: category("baby-care", "Baby Care", "D-05"),
            usage_count: 64,
        },
    ]
}

fn seed_skus() -> Vec<SkuMapping> {
    vec![
        SkuMapping {
            brand_key: "Alaska".to_string(),
            sku_code: "ALK-EVAP-370".to_string(),
            sku_name: Some("Alaska Evaporada 370ml".to_string()),
            category: category("dairy", "Dairy", "D-02"),
            usage_count: 130,
        },
        SkuMapping {
            brand_key: "Lucky Me".to_string(),
            sku_code: "LM-PC-60".to_string(),
            sku_name: Some("Lucky Me Pancit Canton 60g".to_string()),
            category: category("instant-noodles", "Instant Noodles", "D-01"),
            usage_count: 245,
        },
        SkuMapping {
            brand_key: "Kopiko".to_string(),
            sku_code: "KPK-BLANCA-30".to_string(),
            sku_name: Some("Kopiko Blanca Twin Pack".to_string()),
            category: category("coffee", "Coffee", "D-01"),
            usage_count: 98,
        },
    ]
}

fn seed_rules() -> Vec<ClassificationRule> {
    vec![
        ClassificationRule {
            id: 1,
            label: "Breakfast Buyer".to_string(),
            priority: 1,
            include_terms: vec!["almusal".to_string(), "breakfast".to_string()],
            age_min: None,
            age_max: None,
            genders: vec![],
            time_constraint: Some(TimeConstraint::Daypart(TimePreference::EarlyMorning)),
            required_categories: vec!["coffee".to_string(), "dairy".to_string()],
            active: true,
        },
        ClassificationRule {
            id: 2,
            label: "Young Parent".to_string(),
            priority: 1,
            include_terms: vec!["baby".to_string(), "diaper".to_string(), "gatas".to_string()],
            age_min: Some(18),
            age_max: Some(45),
            genders: vec![],
            time_constraint: None,
            required_categories: vec!["baby-care".to_string()],
            active: true,
        },
        ClassificationRule {
            id: 3,
            label: "Sari-Sari Restocker".to_string(),
            priority: 2,
            include_terms: vec!["tingi".to_string(), "paninda".to_string(), "restock".to_string()],
            age_min: None,
            age_max: None,
            genders: vec![],
            time_constraint: None,
            required_categories: vec![],
            active: true,
        },
        ClassificationRule {
            id: 4,
            label: "Night Owl".to_string(),
            priority: 3,
            include_terms: vec!["gabi".to_string(), "late".to_string()],
            age_min: None,
            age_max: None,
            genders: vec![],
            time_constraint: Some(TimeConstraint::Hours { start: 21, end: 4 }),
            required_categories: vec![],
            active: true,
        },
    ]
}

fn seed_line_items() -> Vec<LineItem> {
    vec![
        LineItem {
            brand_name: Some("Alaska".to_string()),
            sku_code: Some("ALK-EVAP-370".to_string()),
            description: Some("Alaska Evaporada 370ml".to_string()),
            quantity: 2,
            unit_price: Decimal::new(3250, 2),
        },
        LineItem {
            brand_name: Some("lucky me".to_string()),
            sku_code: None,
            description: Some("pancit canton sweet style".to_string()),
            quantity: 6,
            unit_price: Decimal::new(1575, 2),
        },
        LineItem {
            brand_name: None,
            sku_code: None,
            description: Some("assorted candies".to_string()),
            quantity: 10,
            unit_price: Decimal::new(100, 2),
        },
    ]
}

fn customer(n: u128) -> CustomerId {
    CustomerId(Uuid::from_u128(n))
}

fn seed_interactions() -> Vec<Interaction> {
    vec![
        Interaction {
            customer_id: customer(1),
            free_text: "pabili po ng kape at gatas pang almusal".to_string(),
            age: Some(34),
            gender: Some(Gender::Female),
            hour_of_day: 6,
            purchased_categories: vec!["coffee".to_string(), "dairy".to_string()],
        },
        Interaction {
            customer_id: customer(2),
            free_text: "diaper para sa baby saka wipes".to_string(),
            age: Some(26),
            gender: Some(Gender::Female),
            hour_of_day: 10,
            purchased_categories: vec!["baby-care".to_string()],
        },
        Interaction {
            customer_id: customer(3),
            free_text: "restock ng paninda sa tindahan".to_string(),
            age: None,
            gender: None,
            hour_of_day: 14,
            purchased_categories: vec!["instant-noodles".to_string(), "laundry".to_string()],
        },
    ]
}

fn seed_transactions() -> Vec<TransactionRecord> {
    let mut records = Vec::new();
    let base = |customer_id: CustomerId, day, hour, store: &str, centavos| TransactionRecord {
        customer_id,
        store_id: StoreId(store.to_string()),
        occurred_at: Utc.with_ymd_and_hms(2026, 8, day, hour, 15, 0).unwrap(),
        total_value: Decimal::new(centavos, 2),
        item_count: 3,
        substitution_accepted: false,
        conversation_length: 9,
        sentiment: Sentiment::Neutral,
    };

    // Customer 1: frequent early-morning shopper, single store.
    for day in 1..=12 {
        records.push(base(customer(1), day, 6, "S-001", 18550));
    }
    // Customer 2: mid-morning, two stores, higher basket value.
    for day in [2, 5, 9, 13, 17, 21] {
        let store = if day % 2 == 0 { "S-001" } else { "S-002" };
        records.push(base(customer(2), day, 10, store, 52075));
    }
    // Customer 3: afternoon bulk restocks across many stores.
    for day in [3, 7, 11, 15] {
        let store = format!("S-{:03}", day % 5 + 1);
        let mut record = base(customer(3), day, 14, &store, 124000);
        record.item_count = 18;
        record.sentiment = Sentiment::Positive;
        records.push(record);
    }
    // Customer 4: a single small purchase, lowest possible history.
    records.push(base(customer(4), 20, 19, "S-002", 4500));

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_dataset_is_internally_consistent() {
        let dataset = SeedDataset::standard();

        for sku in &dataset.skus {
            assert!(
                dataset.brands.iter().any(|brand| brand.brand_key == sku.brand_key),
                "sku {} references unknown brand {}",
                sku.sku_code,
                sku.brand_key
            );
        }
        assert!(dataset.rules.iter().all(|rule| rule.active));
        assert!(!dataset.transactions.is_empty());
    }
}
