//! Task service
//!
//! The single write path for tasks: ACL check, then the tracker, then the
//! hub. REST handlers and the sync reconciler both go through here, so a
//! change replayed from an offline queue is authorized and announced
//! exactly like a direct call.

use crate::backend::acl::AclEngine;
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::middleware::AuthenticatedUser;
use crate::backend::realtime::ConnectionHub;
use crate::shared::acl::Resource;
use crate::shared::event::{EventType, HubMessage};
use crate::shared::permission::PermissionSet;
use crate::shared::task::{CreateTaskRequest, Task, TaskEvent, TaskMutation};

use super::tracker::VersionClockTracker;

#[derive(Clone)]
pub struct TaskService {
    acl: AclEngine,
    tracker: VersionClockTracker,
    hub: ConnectionHub,
}

impl TaskService {
    pub fn new(acl: AclEngine, tracker: VersionClockTracker, hub: ConnectionHub) -> Self {
        Self { acl, tracker, hub }
    }

    pub fn acl(&self) -> &AclEngine {
        &self.acl
    }

    pub fn tracker(&self) -> &VersionClockTracker {
        &self.tracker
    }

    pub fn hub(&self) -> &ConnectionHub {
        &self.hub
    }

    /// Any authenticated principal may create; they become the owner
    pub async fn create(
        &self,
        principal: &AuthenticatedUser,
        task_id: Option<String>,
        request: CreateTaskRequest,
    ) -> BackendResult<Task> {
        let (task, _) = self.tracker.create(&principal.user_id, task_id, request).await?;
        self.announce(EventType::TaskCreated, &task, &principal.user_id).await;
        Ok(task)
    }

    /// Needs WRITE on the task
    pub async fn update(
        &self,
        principal: &AuthenticatedUser,
        task_id: &str,
        mutation: TaskMutation,
    ) -> BackendResult<Task> {
        self.acl
            .require(principal, &Resource::task(task_id), PermissionSet::WRITE)
            .await?;
        let (task, _) = self
            .tracker
            .apply_update(task_id, &principal.user_id, mutation)
            .await?;
        self.announce(EventType::TaskUpdated, &task, &principal.user_id).await;
        Ok(task)
    }

    /// Needs DELETE on the task, and the tracker only lets the owner through
    pub async fn delete(&self, principal: &AuthenticatedUser, task_id: &str) -> BackendResult<Task> {
        self.acl
            .require(principal, &Resource::task(task_id), PermissionSet::DELETE)
            .await?;
        let (task, _) = self.tracker.delete(task_id, &principal.user_id).await?;
        self.announce(EventType::TaskDeleted, &task, &principal.user_id).await;
        Ok(task)
    }

    /// Active task, readable by the principal
    pub async fn get(&self, principal: &AuthenticatedUser, task_id: &str) -> BackendResult<Task> {
        let task = self.tracker.get(task_id).await?;
        if task.is_deleted() {
            return Err(BackendError::not_found(format!("task {} not found", task_id)));
        }
        self.acl
            .require(principal, &Resource::task(task_id), PermissionSet::READ)
            .await?;
        Ok(task)
    }

    /// The principal's own active tasks, newest first
    pub async fn list(&self, principal: &AuthenticatedUser) -> BackendResult<Vec<Task>> {
        self.tracker.list_for_owner(&principal.user_id).await
    }

    /// Event log of a task, readable by the principal
    pub async fn events(&self, principal: &AuthenticatedUser, task_id: &str) -> BackendResult<Vec<TaskEvent>> {
        self.acl
            .require(principal, &Resource::task(task_id), PermissionSet::READ)
            .await?;
        self.tracker.events(task_id).await
    }

    /// The principal's tasks changed after `min_version`
    pub async fn changes_since(&self, principal: &AuthenticatedUser, min_version: i64) -> BackendResult<Vec<Task>> {
        self.tracker.changes_since(&principal.user_id, min_version).await
    }

    /// Tell the task's room and the actor's devices; the owner's devices
    /// too when someone else made the change
    async fn announce(&self, event_type: EventType, task: &Task, actor_id: &str) {
        match HubMessage::for_task(event_type, task, actor_id) {
            Ok(message) => {
                let also_notify = if task.owner_id == actor_id {
                    Vec::new()
                } else {
                    vec![task.owner_id.clone()]
                };
                self.hub.dispatch_to(message, also_notify).await;
            }
            Err(e) => {
                tracing::error!("[Hub] Failed to build {:?} message for {}: {:?}", event_type, task.id, e);
            }
        }
    }
}
