use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub Uuid);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
    Unknown,
}

/// Sentiment assigned to a conversation by the upstream transcript pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// One historical transaction for a customer, as read from the observation
/// tables. Conversation-derived fields default to neutral when the transcript
/// pipeline produced nothing for the transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub customer_id: CustomerId,
    pub store_id: StoreId,
    pub occurred_at: DateTime<Utc>,
    pub total_value: Decimal,
    pub item_count: u32,
    pub substitution_accepted: bool,
    pub conversation_length: u32,
    pub sentiment: Sentiment,
}

impl TransactionRecord {
    pub fn hour_of_day(&self) -> u32 {
        self.occurred_at.hour()
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self.occurred_at.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn weekend_detection_covers_both_days() {
        // 2026-08-22 is a Saturday, 2026-08-24 a Monday.
        let saturday = Utc.with_ymd_and_hms(2026, 8, 22, 9, 0, 0).unwrap();
        let monday = Utc.with_ymd_and_hms(2026, 8, 24, 9, 0, 0).unwrap();

        let mut record = TransactionRecord {
            customer_id: CustomerId(Uuid::nil()),
            store_id: StoreId("S-001".to_string()),
            occurred_at: saturday,
            total_value: Decimal::new(12050, 2),
            item_count: 3,
            substitution_accepted: false,
            conversation_length: 0,
            sentiment: Sentiment::Neutral,
        };
        assert!(record.is_weekend());

        record.occurred_at = monday;
        assert!(!record.is_weekend());
        assert_eq!(record.hour_of_day(), 9);
    }
}
