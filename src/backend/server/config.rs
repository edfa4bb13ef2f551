/**
 * Server Configuration
 *
 * Picks the store the server runs on. With `DATABASE_URL` set the server
 * connects to Postgres and applies migrations; without it the server
 * falls back to the in-memory store so it can still start for local work.
 *
 * Also builds the connection hub, attached to a fan-out when
 * `FANOUT_CAPACITY` is set.
 */

use std::sync::Arc;

use crate::backend::realtime::{BroadcastFanout, ConnectionHub, ExternalFanout};
use crate::backend::store::{MemoryStore, PgStore, Store, StoreError};
use crate::shared::config::AppConfig;

/// Connect the configured store
///
/// # Errors
///
/// A configured database that cannot be reached or migrated is an error;
/// silently running in memory against a production config would lose data.
pub async fn load_store(config: &AppConfig) -> Result<Arc<dyn Store>, StoreError> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("[Server] DATABASE_URL not set. Running on the in-memory store; data will not persist.");
        return Ok(Arc::new(MemoryStore::new()));
    };

    tracing::info!("[Server] Connecting to database...");
    let store = PgStore::connect(database_url).await?;
    tracing::info!("[Server] Database connection pool created successfully");

    tracing::info!("[Server] Running database migrations...");
    store.migrate().await?;
    tracing::info!("[Server] Database migrations completed successfully");

    Ok(Arc::new(store))
}

/// Hub sized from the config, attached to a broadcast fan-out if one is set
pub fn load_hub(config: &AppConfig) -> ConnectionHub {
    let capacity = config.connection_queue_capacity;
    match config.fanout_capacity {
        Some(envelopes) => {
            tracing::info!("[Server] External fan-out enabled ({} envelope buffer)", envelopes);
            let fanout: Arc<dyn ExternalFanout> = Arc::new(BroadcastFanout::new(envelopes));
            ConnectionHub::with_fanout(capacity, fanout)
        }
        None => ConnectionHub::new(capacity),
    }
}
