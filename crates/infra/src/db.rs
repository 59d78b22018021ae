//! Postgres connection pool and schema bootstrap.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::store::StoreError;

const SCHEMA: &str = include_str!("../migrations/0001_schema.sql");

/// Build the process-wide pool. Connections are opened lazily on first use.
pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(database_url)
        .map_err(|e| StoreError::Database {
            operation: "connect",
            message: e.to_string(),
        })
}

/// Create tables and indexes if they do not exist yet. Idempotent.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| StoreError::Database {
            operation: "ensure_schema",
            message: e.to_string(),
        })?;
    tracing::info!("database schema ready");
    Ok(())
}
