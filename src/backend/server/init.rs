/**
 * Server Initialization
 *
 * Builds the application from a validated configuration:
 *
 * 1. Load the store (Postgres with migrations, or in-memory)
 * 2. Build the hub, with a fan-out when configured, and the services into
 *    `AppState`
 * 3. Start the external fan-out subscription when one is attached
 * 4. Start the periodic permission-cache purge
 * 5. Create the router
 */

use std::time::Duration;

use axum::Router;
use tokio::task::JoinHandle;

use crate::backend::acl::AclEngine;
use crate::backend::routes::router::create_router;
use crate::backend::server::config::{load_hub, load_store};
use crate::backend::server::state::AppState;
use crate::backend::store::StoreError;
use crate::shared::config::AppConfig;

/// Create and configure the Axum application
///
/// # Errors
///
/// Fails when a configured database cannot be reached or migrated.
pub async fn create_app(config: AppConfig) -> Result<Router, StoreError> {
    tracing::info!("[Server] Initializing taskmesh backend");

    let app_state = build_state(config).await?;

    match app_state.hub.subscribe_external().await {
        Ok(Some(_)) => tracing::info!("[Server] External fan-out subscription started"),
        Ok(None) => tracing::debug!("[Server] No external fan-out configured"),
        Err(e) => tracing::warn!("[Server] External fan-out unavailable: {}", e),
    }

    spawn_cache_purge(app_state.acl.clone(), app_state.config.permission_cache_ttl);
    tracing::info!("[Server] Router configured with periodic cache purge");

    Ok(create_router(app_state))
}

/// Store, hub and services for `config`, with no background tasks started
pub async fn build_state(config: AppConfig) -> Result<AppState, StoreError> {
    let store = load_store(&config).await?;
    let hub = load_hub(&config);
    Ok(AppState::with_hub(config, store, hub))
}

/// Drop expired permission-cache entries every `every`
pub fn spawn_cache_purge(acl: AclEngine, every: Duration) -> JoinHandle<()> {
    let every = every.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            let purged = acl.permission_store().cache().purge_expired().await;
            tracing::debug!("[Server] Purged {} expired permission cache entries", purged);
        }
    })
}
