/**
 * Application State Management
 *
 * `AppState` is the central state container handed to the router. It
 * holds the validated configuration, the store, and the engine services
 * built on top of it. Every service is a cheap clone over shared `Arc`s.
 *
 * # State Extraction
 *
 * The `FromRef` implementations let handlers extract only the service
 * they use, e.g. `State(acl): State<AclEngine>`, instead of the whole
 * `AppState`.
 */

use std::sync::Arc;

use axum::extract::FromRef;

use crate::backend::acl::{AclEngine, PermissionStore};
use crate::backend::realtime::ConnectionHub;
use crate::backend::store::Store;
use crate::backend::sync::SyncReconciler;
use crate::backend::tasks::{TaskService, VersionClockTracker};
use crate::shared::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    /// Validated configuration
    pub config: Arc<AppConfig>,

    /// Row storage shared by every service
    pub store: Arc<dyn Store>,

    /// Authorization decisions and grant management
    pub acl: AclEngine,

    /// ACL-gated task operations
    pub tasks: TaskService,

    /// Live connection registry
    pub hub: ConnectionHub,

    /// Offline queue replay
    pub sync: SyncReconciler,
}

impl AppState {
    /// Wire every service over `store`, with a hub sized from `config`
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Self {
        let hub = ConnectionHub::new(config.connection_queue_capacity);
        Self::with_hub(config, store, hub)
    }

    /// Same as [`AppState::new`] with a caller-built hub, e.g. one attached
    /// to an external fan-out
    pub fn with_hub(config: AppConfig, store: Arc<dyn Store>, hub: ConnectionHub) -> Self {
        let permissions = PermissionStore::new(
            store.clone(),
            config.permission_cache_ttl,
            config.store_timeout,
        );
        let acl = AclEngine::new(permissions);
        let tracker = VersionClockTracker::new(store.clone(), config.store_timeout);
        let tasks = TaskService::new(acl.clone(), tracker, hub.clone());
        let sync = SyncReconciler::new(tasks.clone());

        Self {
            config: Arc::new(config),
            store,
            acl,
            tasks,
            hub,
            sync,
        }
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for AclEngine {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.acl.clone()
    }
}

impl FromRef<AppState> for TaskService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.tasks.clone()
    }
}

impl FromRef<AppState> for ConnectionHub {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.hub.clone()
    }
}

impl FromRef<AppState> for SyncReconciler {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.sync.clone()
    }
}
