//! Sync reconciler
//!
//! Replays a reconnecting client's offline queue through [`TaskService`],
//! in submitted order, then answers with everything on the caller's
//! account that moved past the version the client last pulled.
//!
//! A change that fails is skipped and not counted. The client is not told
//! which changes failed; the skip is logged at WARN so operators can see
//! it. Field conflicts resolve last-write-wins.

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::middleware::AuthenticatedUser;
use crate::backend::tasks::TaskService;
use crate::shared::sync::{SyncChange, SyncChangeType, SyncRequest, SyncResponse};
use crate::shared::task::{CreateTaskRequest, Task, TaskMutation};

#[derive(Clone)]
pub struct SyncReconciler {
    tasks: TaskService,
}

impl SyncReconciler {
    pub fn new(tasks: TaskService) -> Self {
        Self { tasks }
    }

    pub async fn sync(&self, principal: &AuthenticatedUser, request: SyncRequest) -> BackendResult<SyncResponse> {
        let submitted = request.changes.len();
        let mut synced_count = 0;

        for (position, change) in request.changes.into_iter().enumerate() {
            let change_type = change.change_type;
            let resource_id = change.resource_id.clone();
            match self.apply(principal, change).await {
                Ok(task) => {
                    synced_count += 1;
                    tracing::debug!("[Sync] {} applied {:?} on {}", principal.user_id, change_type, task.id);
                }
                Err(e) => {
                    tracing::warn!(
                        "[Sync] {} skipped change #{} ({:?} on {}): {}",
                        principal.user_id,
                        position,
                        change_type,
                        resource_id.as_deref().unwrap_or("<new>"),
                        e
                    );
                }
            }
        }

        let new_resources = self
            .tasks
            .changes_since(principal, request.last_pulled_version)
            .await?;

        tracing::info!(
            "[Sync] {} synced {}/{} change(s), {} resource(s) past v{}",
            principal.user_id,
            synced_count,
            submitted,
            new_resources.len(),
            request.last_pulled_version
        );
        Ok(SyncResponse {
            synced_count,
            new_resources,
        })
    }

    async fn apply(&self, principal: &AuthenticatedUser, change: SyncChange) -> BackendResult<Task> {
        match change.change_type {
            SyncChangeType::Create => {
                let request: CreateTaskRequest = serde_json::from_value(change.payload)?;
                self.tasks.create(principal, change.resource_id, request).await
            }
            SyncChangeType::Update => {
                let task_id = required_id(change.resource_id)?;
                let mutation: TaskMutation = serde_json::from_value(change.payload)?;
                self.tasks.update(principal, &task_id, mutation).await
            }
            SyncChangeType::Delete => {
                let task_id = required_id(change.resource_id)?;
                self.tasks.delete(principal, &task_id).await
            }
        }
    }
}

fn required_id(resource_id: Option<String>) -> BackendResult<String> {
    resource_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| BackendError::not_found("change names no resource"))
}
