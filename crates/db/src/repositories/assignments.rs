use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use suki_core::domain::customer::CustomerId;
use suki_core::domain::persona::{
    EngagementTier, LoyaltyTier, PersonaAssignment, TimePreference, ValueTier,
};
use suki_core::segmentation::CustomerBehaviorProfile;

use super::{AssignmentRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAssignmentRepository {
    pool: DbPool,
}

impl SqlAssignmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AssignmentRepository for SqlAssignmentRepository {
    async fn replace_run_output(
        &self,
        run_id: Uuid,
        profiles: &[CustomerBehaviorProfile],
        assignments: &[PersonaAssignment],
    ) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let run_id = run_id.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM behavior_profiles").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM persona_assignments").execute(&mut *tx).await?;

        for profile in profiles {
            sqlx::query(
                "INSERT INTO behavior_profiles (customer_id, run_id, profile_json, created_at)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(profile.customer_id.0.to_string())
            .bind(&run_id)
            .bind(serde_json::to_string(profile)?)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        for assignment in assignments {
            sqlx::query(
                "INSERT INTO persona_assignments (
                    customer_id,
                    run_id,
                    label,
                    confidence,
                    engagement_tier,
                    value_tier,
                    loyalty_tier,
                    time_preference,
                    multi_persona,
                    created_at
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(assignment.customer_id.0.to_string())
            .bind(&run_id)
            .bind(&assignment.label)
            .bind(assignment.confidence)
            .bind(engagement_to_str(assignment.engagement_tier))
            .bind(value_to_str(assignment.value_tier))
            .bind(loyalty_to_str(assignment.loyalty_tier))
            .bind(time_to_str(assignment.time_preference))
            .bind(i64::from(assignment.multi_persona))
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_assignment(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<PersonaAssignment>, RepositoryError> {
        let row = sqlx::query(
            "SELECT customer_id, label, confidence, engagement_tier, value_tier,
                    loyalty_tier, time_preference, multi_persona
             FROM persona_assignments
             WHERE customer_id = ?",
        )
        .bind(customer_id.0.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(assignment_from_row).transpose()
    }

    async fn label_counts(&self) -> Result<Vec<(String, u64)>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT label, COUNT(*) AS count
             FROM persona_assignments
             GROUP BY label
             ORDER BY count DESC, label",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (row.get::<String, _>("label"), row.get::<i64, _>("count").max(0) as u64)
            })
            .collect())
    }
}

fn engagement_to_str(tier: EngagementTier) -> &'static str {
    match tier {
        EngagementTier::Champion => "champion",
        EngagementTier::Engaged => "engaged",
        EngagementTier::Regular => "regular",
        EngagementTier::Occasional => "occasional",
        EngagementTier::Dormant => "dormant",
    }
}

fn engagement_from_str(raw: &str) -> Result<EngagementTier, RepositoryError> {
    match raw {
        "champion" => Ok(EngagementTier::Champion),
        "engaged" => Ok(EngagementTier::Engaged),
        "regular" => Ok(EngagementTier::Regular),
        "occasional" => Ok(EngagementTier::Occasional),
        "dormant" => Ok(EngagementTier::Dormant),
        other => Err(RepositoryError::Decode(format!("unknown engagement tier '{other}'"))),
    }
}

fn value_to_str(tier: ValueTier) -> &'static str {
    match tier {
        ValueTier::Premium => "premium",
        ValueTier::High => "high",
        ValueTier::Standard => "standard",
        ValueTier::Budget => "budget",
        ValueTier::Economy => "economy",
    }
}

fn value_from_str(raw: &str) -> Result<ValueTier, RepositoryError> {
    match raw {
        "premium" => Ok(ValueTier::Premium),
        "high" => Ok(ValueTier::High),
        "standard" => Ok(ValueTier::Standard),
        "budget" => Ok(ValueTier::Budget),
        "economy" => Ok(ValueTier::Economy),
        other => Err(RepositoryError::Decode(format!("unknown value tier '{other}'"))),
    }
}

fn loyalty_to_str(tier: LoyaltyTier) -> &'static str {
    match tier {
        LoyaltyTier::SingleStore => "single_store",
        LoyaltyTier::MultiStore => "multi_store",
        LoyaltyTier::Explorer => "explorer",
    }
}

fn loyalty_from_str(raw: &str) -> Result<LoyaltyTier, RepositoryError> {
    match raw {
        "single_store" => Ok(LoyaltyTier::SingleStore),
        "multi_store" => Ok(LoyaltyTier::MultiStore),
        "explorer" => Ok(LoyaltyTier::Explorer),
        other => Err(RepositoryError::Decode(format!("unknown loyalty tier '{other}'"))),
    }
}

fn time_to_str(preference: TimePreference) -> &'static str {
    match preference {
        TimePreference::EarlyMorning => "early_morning",
        TimePreference::Morning => "morning",
        TimePreference::Afternoon => "afternoon",
        TimePreference::Evening => "evening",
        TimePreference::Night => "night",
    }
}

fn time_from_str(raw: &str) -> Result<TimePreference, RepositoryError> {
    match raw {
        "early_morning" => Ok(TimePreference::EarlyMorning),
        "morning" => Ok(TimePreference::Morning),
        "afternoon" => Ok(TimePreference::Afternoon),
        "evening" => Ok(TimePreference::Evening),
        "night" => Ok(TimePreference::Night),
        other => Err(RepositoryError::Decode(format!("unknown time preference '{other}'"))),
    }
}

fn assignment_from_row(row: SqliteRow) -> Result<PersonaAssignment, RepositoryError> {
    let raw_id = row.get::<String, _>("customer_id");
    let customer_id = Uuid::parse_str(&raw_id)
        .map(CustomerId)
        .map_err(|error| RepositoryError::Decode(format!("invalid customer id: {error}")))?;

    Ok(PersonaAssignment {
        customer_id,
        label: row.get("label"),
        confidence: row.get("confidence"),
        engagement_tier: engagement_from_str(&row.get::<String, _>("engagement_tier"))?,
        value_tier: value_from_str(&row.get::<String, _>("value_tier"))?,
        loyalty_tier: loyalty_from_str(&row.get::<String, _>("loyalty_tier"))?,
        time_preference: time_from_str(&row.get::<String, _>("time_preference"))?,
        multi_persona: row.get::<i64, _>("multi_persona") != 0,
    })
}

#[cfg(test)]
mod tests {
    use suki_core::segmentation::extract_profile;

    use super::*;
    use crate::{connect_with_settings, migrations::run_pending};

    fn assignment(n: u128, label: &str) -> PersonaAssignment {
        PersonaAssignment {
            customer_id: CustomerId(Uuid::from_u128(n)),
            label: label.to_string(),
            confidence: 0.7,
            engagement_tier: EngagementTier::Regular,
            value_tier: ValueTier::Standard,
            loyalty_tier: LoyaltyTier::SingleStore,
            time_preference: TimePreference::Morning,
            multi_persona: false,
        }
    }

    #[tokio::test]
    async fn a_new_run_fully_replaces_the_previous_one() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        let repo = SqlAssignmentRepository::new(pool);

        let first_run = Uuid::new_v4();
        repo.replace_run_output(
            first_run,
            &[extract_profile(CustomerId(Uuid::from_u128(1)), &[])],
            &[assignment(1, "Steady Regular"), assignment(2, "Premium Spender")],
        )
        .await
        .expect("first run");

        let second_run = Uuid::new_v4();
        repo.replace_run_output(second_run, &[], &[assignment(1, "Engaged Regular")])
            .await
            .expect("second run");

        let kept = repo
            .find_assignment(&CustomerId(Uuid::from_u128(1)))
            .await
            .expect("find")
            .expect("present");
        assert_eq!(kept.label, "Engaged Regular");

        let gone = repo.find_assignment(&CustomerId(Uuid::from_u128(2))).await.expect("find");
        assert!(gone.is_none(), "prior run's rows must be gone");
    }

    #[tokio::test]
    async fn label_counts_group_and_order() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        let repo = SqlAssignmentRepository::new(pool);

        repo.replace_run_output(
            Uuid::new_v4(),
            &[],
            &[
                assignment(1, "Steady Regular"),
                assignment(2, "Steady Regular"),
                assignment(3, "Premium Spender"),
            ],
        )
        .await
        .expect("save");

        let counts = repo.label_counts().await.expect("counts");
        assert_eq!(
            counts,
            vec![("Steady Regular".to_string(), 2), ("Premium Spender".to_string(), 1)]
        );
    }
}
