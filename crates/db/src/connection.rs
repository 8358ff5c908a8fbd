use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use suki_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// Applied to every pooled connection. WAL keeps readers live while a run's
/// full-replace output transaction commits.
const SESSION_PRAGMAS: &[&str] = &["PRAGMA foreign_keys = ON", "PRAGMA journal_mode = WAL"];

pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&config.url, config.max_connections, config.timeout_secs).await
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let timeout_secs = timeout_secs.max(1);
    // The busy handler waits as long as callers wait for a pooled connection,
    // so writer lock contention surfaces as a single timeout knob.
    let busy_timeout = format!("PRAGMA busy_timeout = {}", timeout_secs * 1000);

    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs))
        .after_connect(move |conn, _meta| {
            let busy_timeout = busy_timeout.clone();
            Box::pin(async move {
                for pragma in SESSION_PRAGMAS {
                    sqlx::query(pragma).execute(&mut *conn).await?;
                }
                sqlx::query(&busy_timeout).execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}
