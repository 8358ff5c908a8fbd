use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use suki_core::domain::customer::Gender;
use suki_core::rules::{ClassificationRule, TimeConstraint};

use super::{RepositoryError, RuleRepository};
use crate::DbPool;

pub struct SqlRuleRepository {
    pool: DbPool,
}

impl SqlRuleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RuleRepository for SqlRuleRepository {
    async fn load_rules(&self) -> Result<Vec<ClassificationRule>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, label, priority, include_terms, age_min, age_max, genders,
                    time_constraint, required_categories, active
             FROM classification_rules
             ORDER BY priority, id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(rule_from_row).collect()
    }

    async fn save_rules(&self, rules: Vec<ClassificationRule>) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for rule in &rules {
            let genders: Vec<Gender> = rule.genders.clone();
            sqlx::query(
                "INSERT INTO classification_rules (
                    id,
                    label,
                    priority,
                    include_terms,
                    age_min,
                    age_max,
                    genders,
                    time_constraint,
                    required_categories,
                    active,
                    updated_at
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    label = excluded.label,
                    priority = excluded.priority,
                    include_terms = excluded.include_terms,
                    age_min = excluded.age_min,
                    age_max = excluded.age_max,
                    genders = excluded.genders,
                    time_constraint = excluded.time_constraint,
                    required_categories = excluded.required_categories,
                    active = excluded.active,
                    updated_at = excluded.updated_at",
            )
            .bind(i64::from(rule.id))
            .bind(&rule.label)
            .bind(i64::from(rule.priority))
            .bind(serde_json::to_string(&rule.include_terms)?)
            .bind(rule.age_min.map(i64::from))
            .bind(rule.age_max.map(i64::from))
            .bind(serde_json::to_string(&genders)?)
            .bind(
                rule.time_constraint
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
            )
            .bind(serde_json::to_string(&rule.required_categories)?)
            .bind(i64::from(rule.active))
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

fn rule_from_row(row: SqliteRow) -> Result<ClassificationRule, RepositoryError> {
    let include_terms: Vec<String> = serde_json::from_str(&row.get::<String, _>("include_terms"))?;
    let genders: Vec<Gender> = serde_json::from_str(&row.get::<String, _>("genders"))?;
    let required_categories: Vec<String> =
        serde_json::from_str(&row.get::<String, _>("required_categories"))?;
    let time_constraint: Option<TimeConstraint> = row
        .get::<Option<String>, _>("time_constraint")
        .map(|raw| serde_json::from_str(&raw))
        .transpose()?;

    Ok(ClassificationRule {
        id: row.get::<i64, _>("id").max(0) as u32,
        label: row.get("label"),
        priority: row.get::<i64, _>("priority").max(0) as u32,
        include_terms,
        age_min: row.get::<Option<i64>, _>("age_min").map(|v| v.max(0) as u32),
        age_max: row.get::<Option<i64>, _>("age_max").map(|v| v.max(0) as u32),
        genders,
        time_constraint,
        required_categories,
        active: row.get::<i64, _>("active") != 0,
    })
}

#[cfg(test)]
mod tests {
    use suki_core::domain::persona::TimePreference;

    use super::*;
    use crate::{connect_with_settings, migrations::run_pending, repositories::RuleRepository};

    #[tokio::test]
    async fn rules_round_trip_including_constraints() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        let repo = SqlRuleRepository::new(pool);

        let rules = vec![
            ClassificationRule {
                id: 1,
                label: "Breakfast Buyer".to_string(),
                priority: 1,
                include_terms: vec!["almusal".to_string(), "breakfast".to_string()],
                age_min: None,
                age_max: None,
                genders: vec![],
                time_constraint: Some(TimeConstraint::Daypart(TimePreference::EarlyMorning)),
                required_categories: vec![],
                active: true,
            },
            ClassificationRule {
                id: 2,
                label: "Young Parent".to_string(),
                priority: 2,
                include_terms: vec!["diaper".to_string()],
                age_min: Some(18),
                age_max: Some(40),
                genders: vec![Gender::Female, Gender::Male],
                time_constraint: Some(TimeConstraint::Hours { start: 21, end: 4 }),
                required_categories: vec!["baby-care".to_string()],
                active: false,
            },
        ];

        repo.save_rules(rules.clone()).await.expect("save");
        let loaded = repo.load_rules().await.expect("load");
        assert_eq!(loaded, rules);
    }

    #[tokio::test]
    async fn saving_twice_updates_in_place() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        let repo = SqlRuleRepository::new(pool);

        let mut rule = ClassificationRule {
            id: 7,
            label: "Sari-Sari Stocker".to_string(),
            priority: 3,
            include_terms: vec!["tingi".to_string()],
            age_min: None,
            age_max: None,
            genders: vec![],
            time_constraint: None,
            required_categories: vec![],
            active: true,
        };
        repo.save_rules(vec![rule.clone()]).await.expect("first save");

        rule.priority = 1;
        repo.save_rules(vec![rule.clone()]).await.expect("second save");

        let loaded = repo.load_rules().await.expect("load");
        assert_eq!(loaded, vec![rule]);
    }
}
