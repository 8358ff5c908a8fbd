use chrono::{Duration, Utc};
use serde_json::json;
use tracing::info;

use crate::commands::CommandResult;
use suki_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use suki_core::pipeline::{BatchInput, BatchRunner};
use suki_core::rules::RuleCatalog;
use suki_core::taxonomy::TaxonomyDictionary;
use suki_db::repositories::{
    AssignmentRepository, ObservationRepository, RuleRepository, SqlAssignmentRepository,
    SqlObservationRepository, SqlRuleRepository, SqlTaxonomyRepository, TaxonomyRepository,
};
use suki_db::{connect, migrations};

fn init_logging(config: &AppConfig) {
    use suki_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    // try_init: repeated invocations in one process keep the first subscriber.
    let result = match config.logging.format {
        Compact => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .compact()
            .try_init(),
        Pretty => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .pretty()
            .try_init(),
        Json => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .json()
            .try_init(),
    };
    let _ = result;
}

pub fn run(window_days: Option<u32>) -> CommandResult {
    let options = LoadOptions {
        overrides: ConfigOverrides { observation_window_days: window_days, ..Default::default() },
        ..Default::default()
    };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "run",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };
    init_logging(&config);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "run",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(execute(&config));

    match result {
        Ok((summary, details)) => {
            CommandResult::success_with_details("run", summary, Some(details))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("run", error_class, message, exit_code)
        }
    }
}

async fn execute(
    config: &AppConfig,
) -> Result<(String, serde_json::Value), (&'static str, String, u8)> {
    let pool = connect(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

    migrations::run_pending(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), 5u8))?;

    let taxonomy_repo = SqlTaxonomyRepository::new(pool.clone());
    let brands = taxonomy_repo
        .load_brand_mappings()
        .await
        .map_err(|error| ("reference_load", error.to_string(), 6u8))?;
    let skus = taxonomy_repo
        .load_sku_mappings()
        .await
        .map_err(|error| ("reference_load", error.to_string(), 6u8))?;
    let taxonomy = TaxonomyDictionary::from_mappings(brands, skus)
        .map_err(|error| ("reference_validation", error.to_string(), 7u8))?;

    let rule_repo = SqlRuleRepository::new(pool.clone());
    let rules = rule_repo
        .load_rules()
        .await
        .map_err(|error| ("reference_load", error.to_string(), 6u8))?;
    let catalog = RuleCatalog::new(rules)
        .map_err(|error| ("reference_validation", error.to_string(), 7u8))?;

    let observations = SqlObservationRepository::new(pool.clone());
    let cutoff = Utc::now() - Duration::days(i64::from(config.batch.observation_window_days));
    let input = BatchInput {
        line_items: observations
            .load_line_items()
            .await
            .map_err(|error| ("observation_load", error.to_string(), 6u8))?,
        interactions: observations
            .load_interactions()
            .await
            .map_err(|error| ("observation_load", error.to_string(), 6u8))?,
        transactions: observations
            .load_transactions_since(cutoff)
            .await
            .map_err(|error| ("observation_load", error.to_string(), 6u8))?,
    };

    let runner = BatchRunner::new(taxonomy, catalog);
    let output = runner.run(input);

    let assignments = SqlAssignmentRepository::new(pool.clone());
    assignments
        .replace_run_output(output.run_id, &output.profiles, &output.assignments)
        .await
        .map_err(|error| ("output_persistence", error.to_string(), 8u8))?;

    info!(
        event_name = "cli.run.persisted",
        run_id = %output.run_id,
        assignments = output.assignments.len(),
        "batch output persisted"
    );

    pool.close().await;

    let summary = format!(
        "run {} assigned {} customers ({} items resolved, coverage {:.1}%)",
        output.run_id,
        output.assignments.len(),
        output.items.len(),
        output.coverage.coverage_ratio() * 100.0,
    );
    let details = json!({
        "run_id": output.run_id,
        "assigned": output.assignments.len(),
        "items_resolved": output.items.len(),
        "coverage_pct": output.coverage.coverage_ratio() * 100.0,
    });
    Ok((summary, details))
}
