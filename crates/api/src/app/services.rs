//! Store selection and service wiring.

use std::sync::Arc;

use stockroom_infra::db;
use stockroom_infra::service::InventoryService;
use stockroom_infra::store::{InMemoryInventoryStore, InventoryStore, PostgresInventoryStore};

use crate::config::AppConfig;

/// The service the handlers talk to, over whichever store was configured.
pub type AppServices = InventoryService<Arc<dyn InventoryStore>>;

/// Build the process-wide service. Called once at startup.
///
/// With `DATABASE_URL` set the Postgres store is used (pool connects lazily;
/// the schema bootstrap is its first use). Otherwise everything lives in
/// memory and is lost on restart.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store: Arc<dyn InventoryStore> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = db::connect_lazy(url, config.database_max_connections)?;
            db::ensure_schema(&pool).await?;
            tracing::info!(
                max_connections = config.database_max_connections,
                "using postgres inventory store"
            );
            Arc::new(PostgresInventoryStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (data is not persisted)");
            Arc::new(InMemoryInventoryStore::new())
        }
    };

    Ok(InventoryService::new(store))
}
