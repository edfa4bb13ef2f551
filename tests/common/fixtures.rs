//! Application fixtures
//!
//! Every fixture runs on a fresh `MemoryStore`, so tests never share rows
//! and need no database.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use taskmesh::backend::routes::router::create_router;
use taskmesh::backend::server::AppState;
use taskmesh::backend::store::MemoryStore;
use taskmesh::shared::acl::{AccessControlEntry, GrantRequest, Resource};
use taskmesh::shared::config::AppConfig;
use taskmesh::shared::event::HubMessage;
use taskmesh::shared::permission::{GranteeType, PermissionSet};
use taskmesh::shared::task::{CreateTaskRequest, Task, TaskMutation};

use super::auth_helpers::{principal, TEST_SECRET};

/// Services wired over an in-memory store
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config(Duration::from_secs(3600), 16))
    }

    /// App whose permission cache expires after `ttl`
    pub fn with_cache_ttl(ttl: Duration) -> Self {
        Self::with_config(test_config(ttl, 16))
    }

    /// App whose connections hold at most `capacity` queued messages
    pub fn with_queue_capacity(capacity: usize) -> Self {
        Self::with_config(test_config(Duration::from_secs(3600), capacity))
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store.clone());
        Self { store, state }
    }

    /// Full router, auth layer included
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    pub async fn create_task(&self, owner: &str, title: &str) -> Task {
        self.state
            .tasks
            .create(&principal(owner), None, CreateTaskRequest::new(title))
            .await
            .expect("Failed to create task")
    }

    /// Bump a task `times` times as `actor`, returning the last version
    pub async fn touch(&self, actor: &str, task_id: &str, times: usize) -> Task {
        let mut last = None;
        for n in 0..times {
            let mutation = TaskMutation {
                description: Some(format!("revision {}", n)),
                ..TaskMutation::default()
            };
            last = Some(
                self.state
                    .tasks
                    .update(&principal(actor), task_id, mutation)
                    .await
                    .expect("Failed to update task"),
            );
        }
        last.expect("touch needs at least one revision")
    }

    pub async fn grant_user(
        &self,
        actor: &str,
        resource: &Resource,
        grantee: &str,
        permissions: PermissionSet,
    ) -> AccessControlEntry {
        self.grant(actor, grant_request(resource, GranteeType::User, Some(grantee), permissions, None))
            .await
    }

    pub async fn grant(&self, actor: &str, request: GrantRequest) -> AccessControlEntry {
        self.state
            .acl
            .grant(&principal(actor), request)
            .await
            .expect("Failed to grant")
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

pub fn test_config(cache_ttl: Duration, queue_capacity: usize) -> AppConfig {
    AppConfig::builder()
        .jwt_secret(TEST_SECRET)
        .permission_cache_ttl(cache_ttl)
        .connection_queue_capacity(queue_capacity)
        .store_timeout(Duration::from_secs(2))
        .build()
        .expect("Failed to build test config")
}

pub fn grant_request(
    resource: &Resource,
    grantee_type: GranteeType,
    grantee_id: Option<&str>,
    permissions: PermissionSet,
    expires_at: Option<DateTime<Utc>>,
) -> GrantRequest {
    GrantRequest {
        resource_id: resource.resource_id.clone(),
        resource_type: resource.resource_type,
        grantee_type,
        grantee_id: grantee_id.map(str::to_string),
        permissions,
        expires_at,
        metadata: None,
    }
}

/// Next hub message on a connection's queue, failing after one second
pub async fn next_message(rx: &mut mpsc::Receiver<Bytes>) -> HubMessage {
    let data = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("Timed out waiting for hub message")
        .expect("Connection queue closed");
    serde_json::from_slice(&data).expect("Hub message is not valid JSON")
}

/// Assert nothing is waiting on a connection's queue
pub fn assert_no_message(rx: &mut mpsc::Receiver<Bytes>) {
    assert!(rx.try_recv().is_err(), "Expected an empty connection queue");
}
