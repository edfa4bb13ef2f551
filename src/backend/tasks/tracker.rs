//! Version/clock tracker
//!
//! Owns the version and vector-clock bookkeeping of tasks. Every accepted
//! mutation moves `version` forward by one, ticks `clock[actor]` by one and
//! appends exactly one event in the same store transaction.
//!
//! The tracker trusts its caller on authorization. The only check it makes
//! itself is the row-level ownership re-check on delete, done by the store
//! under the row lock.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::store::{bounded, Store};
use crate::shared::task::{CreateTaskRequest, Task, TaskChange, TaskEvent, TaskEventType, TaskMutation};

#[derive(Clone)]
pub struct VersionClockTracker {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl VersionClockTracker {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// New task at version 1 with clock `{owner: 1}` and a CREATED event.
    /// A client-chosen `task_id` is kept; a taken id is a conflict.
    pub async fn create(
        &self,
        owner_id: &str,
        task_id: Option<String>,
        request: CreateTaskRequest,
    ) -> BackendResult<(Task, TaskEvent)> {
        let task = Task::create(task_id, owner_id, request, Utc::now())?;
        let payload = serde_json::to_value(&task)?;
        let event = TaskEvent::for_task(&task, TaskEventType::Created, owner_id, payload);

        let event = bounded(self.timeout, self.store.insert_task(&task, event)).await?;
        tracing::info!(
            "[Tracker] {} created task {} (seq {})",
            owner_id,
            task.id,
            event.sequence_number
        );
        Ok((task, event))
    }

    /// Overwrite the supplied fields of an active task
    pub async fn apply_update(
        &self,
        task_id: &str,
        actor_id: &str,
        mutation: TaskMutation,
    ) -> BackendResult<(Task, TaskEvent)> {
        mutation.validate()?;
        self.apply(task_id, actor_id, TaskChange::Update(mutation)).await
    }

    /// Soft delete. Only the row's owner gets through; anyone else sees
    /// the task as missing.
    pub async fn delete(&self, task_id: &str, actor_id: &str) -> BackendResult<(Task, TaskEvent)> {
        self.apply(task_id, actor_id, TaskChange::Delete).await
    }

    async fn apply(
        &self,
        task_id: &str,
        actor_id: &str,
        change: TaskChange,
    ) -> BackendResult<(Task, TaskEvent)> {
        let applied = bounded(
            self.timeout,
            self.store.apply_change(task_id, actor_id, &change, Utc::now()),
        )
        .await?;

        let (task, event) = applied.ok_or_else(|| {
            tracing::debug!("[Tracker] {} found no active task {} to change", actor_id, task_id);
            BackendError::not_found(format!("task {} not found", task_id))
        })?;

        tracing::info!(
            "[Tracker] {} {} task {} -> v{} (clock[{}]={})",
            actor_id,
            event.event_type,
            task.id,
            task.version,
            actor_id,
            task.clock.get(actor_id)
        );
        Ok((task, event))
    }

    /// Tasks of `owner_id` changed after `min_version`, oldest change first.
    /// Deleted tasks are included so clients learn about them.
    pub async fn changes_since(&self, owner_id: &str, min_version: i64) -> BackendResult<Vec<Task>> {
        Ok(bounded(self.timeout, self.store.changes_since(owner_id, min_version)).await?)
    }

    pub async fn get(&self, task_id: &str) -> BackendResult<Task> {
        bounded(self.timeout, self.store.get_task(task_id))
            .await?
            .ok_or_else(|| BackendError::not_found(format!("task {} not found", task_id)))
    }

    /// Active tasks of `owner_id`, newest first
    pub async fn list_for_owner(&self, owner_id: &str) -> BackendResult<Vec<Task>> {
        Ok(bounded(self.timeout, self.store.list_tasks(owner_id)).await?)
    }

    pub async fn events(&self, task_id: &str) -> BackendResult<Vec<TaskEvent>> {
        Ok(bounded(self.timeout, self.store.task_events(task_id)).await?)
    }
}
