use serde_json::json;

use crate::commands::CommandResult;
use suki_core::config::{AppConfig, LoadOptions};
use suki_db::{connect, migrations, SeedDataset};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seeded = SeedDataset::standard()
            .apply(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 6u8))?;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(seeded)
    });

    match result {
        Ok(seeded) => CommandResult::success_with_details(
            "seed",
            format!(
                "seeded {} brand mappings, {} sku mappings, {} rules, {} line items, {} interactions, {} transactions",
                seeded.brand_mappings,
                seeded.sku_mappings,
                seeded.rules,
                seeded.line_items,
                seeded.interactions,
                seeded.transactions,
            ),
            Some(json!({
                "brand_mappings": seeded.brand_mappings,
                "sku_mappings": seeded.sku_mappings,
                "rules": seeded.rules,
                "line_items": seeded.line_items,
                "interactions": seeded.interactions,
                "transactions": seeded.transactions,
            })),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}
