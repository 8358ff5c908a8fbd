//! Per-customer behavioral feature extraction.
//!
//! Pure aggregation over a customer's transactions inside the observation
//! window. Missing or malformed inputs degrade to neutral values; extraction
//! never fails for a single customer.

use std::collections::HashSet;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::customer::{CustomerId, Sentiment, TransactionRecord};
use crate::domain::persona::TimePreference;

/// Aggregated behavior over the observation window. Fully derived, discarded
/// and recomputed each batch run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerBehaviorProfile {
    pub customer_id: CustomerId,
    pub transaction_count: u32,
    pub avg_value: Decimal,
    pub std_value: f64,
    pub store_count: u32,
    pub active_days: u32,
    pub lifespan_days: u32,
    /// Transactions per lifespan day.
    pub transaction_frequency: f64,
    /// Share of transactions on weekdays, in [0,1].
    pub weekday_ratio: f64,
    /// Counts per time-of-day bucket, ordered as [`TimePreference::ALL`].
    pub time_histogram: [u32; 5],
    pub avg_basket_size: f64,
    pub substitution_count: u32,
    pub avg_conversation_length: f64,
    pub positive_ratio: f64,
    pub negative_ratio: f64,
}

impl CustomerBehaviorProfile {
    /// Neutral profile for a customer with no transactions in the window.
    pub fn empty(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            transaction_count: 0,
            avg_value: Decimal::ZERO,
            std_value: 0.0,
            store_count: 0,
            active_days: 0,
            lifespan_days: 0,
            transaction_frequency: 0.0,
            weekday_ratio: 0.0,
            time_histogram: [0; 5],
            avg_basket_size: 0.0,
            substitution_count: 0,
            avg_conversation_length: 0.0,
            positive_ratio: 0.0,
            negative_ratio: 0.0,
        }
    }

    /// Dominant time-of-day bucket. Ties resolve to the earlier bucket so the
    /// result is stable across runs.
    pub fn dominant_time(&self) -> TimePreference {
        let mut best = 0usize;
        for (index, count) in self.time_histogram.iter().enumerate() {
            if *count > self.time_histogram[best] {
                best = index;
            }
        }
        TimePreference::ALL[best]
    }
}

/// Extract the behavior profile from a customer's transactions. The caller
/// is responsible for windowing the records; everything passed in counts.
pub fn extract_profile(
    customer_id: CustomerId,
    records: &[TransactionRecord],
) -> CustomerBehaviorProfile {
    if records.is_empty() {
        return CustomerBehaviorProfile::empty(customer_id);
    }

    let count = records.len() as u32;
    let count_f = records.len() as f64;

    let total_value: Decimal = records.iter().map(|r| r.total_value).sum();
    let avg_value = total_value / Decimal::from(count);

    let avg_value_f = avg_value.to_f64().unwrap_or(0.0);
    let variance = records
        .iter()
        .map(|r| {
            let value = r.total_value.to_f64().unwrap_or(0.0);
            (value - avg_value_f).powi(2)
        })
        .sum::<f64>()
        / count_f;
    let std_value = variance.sqrt();

    let store_count =
        records.iter().map(|r| r.store_id.clone()).collect::<HashSet<_>>().len() as u32;

    let active_days =
        records.iter().map(|r| r.occurred_at.date_naive()).collect::<HashSet<_>>().len() as u32;

    let first = records.iter().map(|r| r.occurred_at).min().unwrap_or_default();
    let last = records.iter().map(|r| r.occurred_at).max().unwrap_or_default();
    let lifespan_days = ((last - first).num_days().max(0) as u32) + 1;
    let transaction_frequency = count_f / lifespan_days as f64;

    let weekday = records.iter().filter(|r| !r.is_weekend()).count() as f64;
    let weekday_ratio = weekday / count_f;

    let mut time_histogram = [0u32; 5];
    for record in records {
        let bucket = TimePreference::from_hour(record.hour_of_day());
        let index = TimePreference::ALL.iter().position(|b| *b == bucket).unwrap_or(4);
        time_histogram[index] += 1;
    }

    let avg_basket_size = records.iter().map(|r| r.item_count as f64).sum::<f64>() / count_f;
    let substitution_count = records.iter().filter(|r| r.substitution_accepted).count() as u32;
    let avg_conversation_length =
        records.iter().map(|r| r.conversation_length as f64).sum::<f64>() / count_f;

    let positive = records.iter().filter(|r| r.sentiment == Sentiment::Positive).count() as f64;
    let negative = records.iter().filter(|r| r.sentiment == Sentiment::Negative).count() as f64;

    CustomerBehaviorProfile {
        customer_id,
        transaction_count: count,
        avg_value,
        std_value,
        store_count,
        active_days,
        lifespan_days,
        transaction_frequency,
        weekday_ratio,
        time_histogram,
        avg_basket_size,
        substitution_count,
        avg_conversation_length,
        positive_ratio: positive / count_f,
        negative_ratio: negative / count_f,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::domain::customer::StoreId;

    fn record(day: u32, hour: u32, store: &str, value: i64) -> TransactionRecord {
        TransactionRecord {
            customer_id: CustomerId(Uuid::nil()),
            store_id: StoreId(store.to_string()),
            occurred_at: Utc.with_ymd_and_hms(2026, 8, day, hour, 30, 0).unwrap(),
            total_value: Decimal::new(value, 2),
            item_count: 2,
            substitution_accepted: false,
            conversation_length: 12,
            sentiment: Sentiment::Positive,
        }
    }

    #[test]
    fn empty_history_yields_neutral_profile() {
        let profile = extract_profile(CustomerId(Uuid::nil()), &[]);
        assert_eq!(profile.transaction_count, 0);
        assert_eq!(profile.avg_value, Decimal::ZERO);
        assert_eq!(profile.dominant_time(), TimePreference::EarlyMorning);
    }

    #[test]
    fn aggregates_counts_stores_and_days() {
        // Three transactions, two stores, two distinct days, span of 3 days.
        let records = vec![
            record(10, 9, "S-1", 10000),
            record(10, 18, "S-2", 20000),
            record(12, 9, "S-1", 30000),
        ];
        let profile = extract_profile(CustomerId(Uuid::nil()), &records);

        assert_eq!(profile.transaction_count, 3);
        assert_eq!(profile.store_count, 2);
        assert_eq!(profile.active_days, 2);
        assert_eq!(profile.lifespan_days, 3);
        assert!((profile.transaction_frequency - 1.0).abs() < 1e-9);
        assert_eq!(profile.avg_value, Decimal::new(20000, 2));
        assert!((profile.positive_ratio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn dominant_time_breaks_ties_toward_earlier_bucket() {
        // One morning and one evening transaction: morning wins the tie.
        let records = vec![record(10, 9, "S-1", 10000), record(10, 18, "S-1", 10000)];
        let profile = extract_profile(CustomerId(Uuid::nil()), &records);
        assert_eq!(profile.dominant_time(), TimePreference::Morning);
    }

    #[test]
    fn weekday_ratio_reflects_weekend_mix() {
        // 2026-08-22 is a Saturday, 2026-08-24 a Monday.
        let records = vec![record(22, 9, "S-1", 10000), record(24, 9, "S-1", 10000)];
        let profile = extract_profile(CustomerId(Uuid::nil()), &records);
        assert!((profile.weekday_ratio - 0.5).abs() < 1e-9);
    }
}
