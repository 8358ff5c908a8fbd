use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};
use tracing::warn;
use uuid::Uuid;

use suki_core::domain::customer::{CustomerId, Gender, Sentiment, StoreId, TransactionRecord};
use suki_core::domain::interaction::Interaction;
use suki_core::domain::item::LineItem;

use super::{ObservationRepository, RepositoryError};
use crate::DbPool;

/// Observation tables are append-only operational data, so the load path is
/// tolerant of bad rows: enum values nobody recognizes degrade to neutral,
/// and a row whose identity or numeric fields cannot be decoded is skipped
/// with a data-quality event instead of aborting the whole batch load.
pub struct SqlObservationRepository {
    pool: DbPool,
}

impl SqlObservationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ObservationRepository for SqlObservationRepository {
    async fn load_line_items(&self) -> Result<Vec<LineItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT brand_name, sku_code, description, quantity, unit_price
             FROM line_items
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(collect_decodable(rows, "line_items", line_item_from_row))
    }

    async fn load_interactions(&self) -> Result<Vec<Interaction>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT customer_id, free_text, age, gender, hour_of_day, purchased_categories
             FROM interactions
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(collect_decodable(rows, "interactions", interaction_from_row))
    }

    async fn load_transactions_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT customer_id, store_id, occurred_at, total_value, item_count,
                    substitution_accepted, conversation_length, sentiment
             FROM transactions
             WHERE occurred_at >= ?
             ORDER BY occurred_at, id",
        )
        .bind(cutoff.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        Ok(collect_decodable(rows, "transactions", transaction_from_row))
    }

    async fn record_line_item(&self, item: LineItem) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO line_items (
                brand_name, sku_code, description, quantity, unit_price, recorded_at
             ) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(item.brand_name.as_deref())
        .bind(item.sku_code.as_deref())
        .bind(item.description.as_deref())
        .bind(i64::from(item.quantity))
        .bind(item.unit_price.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_interaction(&self, interaction: Interaction) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO interactions (
                customer_id, free_text, age, gender, hour_of_day,
                purchased_categories, recorded_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(interaction.customer_id.0.to_string())
        .bind(&interaction.free_text)
        .bind(interaction.age.map(i64::from))
        .bind(interaction.gender.map(gender_to_str))
        .bind(i64::from(interaction.hour_of_day))
        .bind(serde_json::to_string(&interaction.purchased_categories)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_transaction(&self, record: TransactionRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO transactions (
                customer_id, store_id, occurred_at, total_value, item_count,
                substitution_accepted, conversation_length, sentiment
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.customer_id.0.to_string())
        .bind(&record.store_id.0)
        .bind(record.occurred_at.to_rfc3339())
        .bind(record.total_value.to_string())
        .bind(i64::from(record.item_count))
        .bind(i64::from(record.substitution_accepted))
        .bind(i64::from(record.conversation_length))
        .bind(sentiment_to_str(record.sentiment))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn gender_to_str(gender: Gender) -> &'static str {
    match gender {
        Gender::Female => "female",
        Gender::Male => "male",
        Gender::Unknown => "unknown",
    }
}

fn gender_from_str(raw: &str) -> Gender {
    match raw {
        "female" => Gender::Female,
        "male" => Gender::Male,
        "unknown" => Gender::Unknown,
        other => {
            warn!(
                event_name = "observations.value_degraded",
                field = "gender",
                value = other,
                "unrecognized gender value treated as unknown"
            );
            Gender::Unknown
        }
    }
}

fn sentiment_to_str(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Positive => "positive",
        Sentiment::Neutral => "neutral",
        Sentiment::Negative => "negative",
    }
}

fn sentiment_from_str(raw: &str) -> Sentiment {
    match raw {
        "positive" => Sentiment::Positive,
        "neutral" => Sentiment::Neutral,
        "negative" => Sentiment::Negative,
        other => {
            warn!(
                event_name = "observations.value_degraded",
                field = "sentiment",
                value = other,
                "unrecognized sentiment value treated as neutral"
            );
            Sentiment::Neutral
        }
    }
}

fn customer_id_from_str(raw: &str) -> Result<CustomerId, RepositoryError> {
    Uuid::parse_str(raw)
        .map(CustomerId)
        .map_err(|error| RepositoryError::Decode(format!("invalid customer id '{raw}': {error}")))
}

fn decimal_from_str(raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw)
        .map_err(|error| RepositoryError::Decode(format!("invalid decimal '{raw}': {error}")))
}

fn timestamp_from_str(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid timestamp '{raw}': {error}")))
}

/// Decode each row independently; skip the ones that fail so one malformed
/// record cannot take down a batch load.
fn collect_decodable<T>(
    rows: Vec<SqliteRow>,
    table: &'static str,
    decode: impl Fn(SqliteRow) -> Result<T, RepositoryError>,
) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match decode(row) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(
                    event_name = "observations.row_skipped",
                    table,
                    %error,
                    "skipping observation row that failed to decode"
                );
                None
            }
        })
        .collect()
}

fn line_item_from_row(row: SqliteRow) -> Result<LineItem, RepositoryError> {
    Ok(LineItem {
        brand_name: row.get("brand_name"),
        sku_code: row.get("sku_code"),
        description: row.get("description"),
        quantity: row.get::<i64, _>("quantity").max(0) as u32,
        unit_price: decimal_from_str(&row.get::<String, _>("unit_price"))?,
    })
}

fn interaction_from_row(row: SqliteRow) -> Result<Interaction, RepositoryError> {
    let purchased_categories = serde_json::from_str(&row.get::<String, _>("purchased_categories"))
        .unwrap_or_else(|error| {
            warn!(
                event_name = "observations.value_degraded",
                field = "purchased_categories",
                %error,
                "unreadable category list treated as empty"
            );
            Vec::new()
        });

    Ok(Interaction {
        customer_id: customer_id_from_str(&row.get::<String, _>("customer_id"))?,
        free_text: row.get("free_text"),
        age: row.get::<Option<i64>, _>("age").map(|v| v.max(0) as u32),
        gender: row.get::<Option<String>, _>("gender").map(|raw| gender_from_str(&raw)),
        hour_of_day: row.get::<i64, _>("hour_of_day").max(0) as u32,
        purchased_categories,
    })
}

fn transaction_from_row(row: SqliteRow) -> Result<TransactionRecord, RepositoryError> {
    Ok(TransactionRecord {
        customer_id: customer_id_from_str(&row.get::<String, _>("customer_id"))?,
        store_id: StoreId(row.get("store_id")),
        occurred_at: timestamp_from_str(&row.get::<String, _>("occurred_at"))?,
        total_value: decimal_from_str(&row.get::<String, _>("total_value"))?,
        item_count: row.get::<i64, _>("item_count").max(0) as u32,
        substitution_accepted: row.get::<i64, _>("substitution_accepted") != 0,
        conversation_length: row.get::<i64, _>("conversation_length").max(0) as u32,
        sentiment: sentiment_from_str(&row.get::<String, _>("sentiment")),
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{connect_with_settings, migrations::run_pending};

    fn transaction(hour: u32) -> TransactionRecord {
        TransactionRecord {
            customer_id: CustomerId(Uuid::from_u128(9)),
            store_id: StoreId("S-1".to_string()),
            occurred_at: Utc.with_ymd_and_hms(2026, 7, 10, hour, 30, 0).unwrap(),
            total_value: Decimal::new(12550, 2),
            item_count: 4,
            substitution_accepted: true,
            conversation_length: 12,
            sentiment: Sentiment::Positive,
        }
    }

    #[tokio::test]
    async fn transactions_round_trip_and_respect_the_cutoff() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        let repo = SqlObservationRepository::new(pool);

        let recent = transaction(9);
        let mut old = transaction(9);
        old.occurred_at = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();

        repo.record_transaction(old).await.expect("record old");
        repo.record_transaction(recent.clone()).await.expect("record recent");

        let cutoff = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let loaded = repo.load_transactions_since(cutoff).await.expect("load");
        assert_eq!(loaded, vec![recent]);
    }

    #[tokio::test]
    async fn malformed_transaction_rows_are_skipped_not_fatal() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        let repo = SqlObservationRepository::new(pool.clone());

        let valid = transaction(9);
        repo.record_transaction(valid.clone()).await.expect("record valid");

        sqlx::query(
            "INSERT INTO transactions (
                customer_id, store_id, occurred_at, total_value, item_count,
                substitution_accepted, conversation_length, sentiment
             ) VALUES (?, 'S-1', ?, 'NOT_A_NUMBER', 1, 0, 0, 'neutral')",
        )
        .bind(Uuid::from_u128(8).to_string())
        .bind(Utc.with_ymd_and_hms(2026, 7, 11, 10, 0, 0).unwrap().to_rfc3339())
        .execute(&pool)
        .await
        .expect("insert malformed row");

        let cutoff = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let loaded = repo.load_transactions_since(cutoff).await.expect("load survives bad row");
        assert_eq!(loaded, vec![valid], "the decodable row must still come back");
    }

    #[tokio::test]
    async fn unrecognized_enum_values_degrade_to_neutral() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        let repo = SqlObservationRepository::new(pool.clone());

        sqlx::query(
            "INSERT INTO transactions (
                customer_id, store_id, occurred_at, total_value, item_count,
                substitution_accepted, conversation_length, sentiment
             ) VALUES (?, 'S-1', ?, '55.00', 2, 0, 5, 'ecstatic')",
        )
        .bind(Uuid::from_u128(8).to_string())
        .bind(Utc.with_ymd_and_hms(2026, 7, 11, 10, 0, 0).unwrap().to_rfc3339())
        .execute(&pool)
        .await
        .expect("insert transaction");

        sqlx::query(
            "INSERT INTO interactions (
                customer_id, free_text, age, gender, hour_of_day,
                purchased_categories, recorded_at
             ) VALUES (?, 'pabili po', NULL, 'other', 10, 'not json', ?)",
        )
        .bind(Uuid::from_u128(8).to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&pool)
        .await
        .expect("insert interaction");

        let cutoff = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let transactions = repo.load_transactions_since(cutoff).await.expect("load");
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].sentiment, Sentiment::Neutral);

        let interactions = repo.load_interactions().await.expect("load");
        assert_eq!(interactions.len(), 1);
        assert_eq!(interactions[0].gender, Some(Gender::Unknown));
        assert!(interactions[0].purchased_categories.is_empty());
    }

    #[tokio::test]
    async fn interactions_round_trip_with_optional_demographics() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        let repo = SqlObservationRepository::new(pool);

        let with_demographics = Interaction {
            customer_id: CustomerId(Uuid::from_u128(1)),
            free_text: "pabili po ng gatas para sa baby".to_string(),
            age: Some(27),
            gender: Some(Gender::Female),
            hour_of_day: 8,
            purchased_categories: vec!["dairy".to_string()],
        };
        let anonymous = Interaction {
            customer_id: CustomerId(Uuid::from_u128(2)),
            free_text: "load lang".to_string(),
            age: None,
            gender: None,
            hour_of_day: 20,
            purchased_categories: vec![],
        };

        repo.record_interaction(with_demographics.clone()).await.expect("record 1");
        repo.record_interaction(anonymous.clone()).await.expect("record 2");

        let loaded = repo.load_interactions().await.expect("load");
        assert_eq!(loaded, vec![with_demographics, anonymous]);
    }

    #[tokio::test]
    async fn line_items_round_trip() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        let repo = SqlObservationRepository::new(pool);

        let item = LineItem {
            brand_name: Some("Alaska".to_string()),
            sku_code: None,
            description: Some("Alaska Evap 370ml".to_string()),
            quantity: 2,
            unit_price: Decimal::new(3250, 2),
        };
        repo.record_line_item(item.clone()).await.expect("record");

        let loaded = repo.load_line_items().await.expect("load");
        assert_eq!(loaded, vec![item]);
    }
}
