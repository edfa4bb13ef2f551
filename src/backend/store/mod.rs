//! Persistence
//!
//! The [`Store`] trait is the only way the engine touches rows. Every
//! method is one transaction: a task write and its event append either
//! both land or neither does.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryStore`] - a single lock around all tables; used by tests and
//!   whenever no database is configured
//! - [`PgStore`] - sqlx over Postgres with explicit transactions

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::shared::acl::{AccessControlEntry, Resource};
use crate::shared::permission::{Grantee, ResourceType};
use crate::shared::task::{Task, TaskChange, TaskEvent};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend could not be reached or failed mid-call
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Call exceeded its time budget
    #[error("store call exceeded {0:?}")]
    Timeout(Duration),

    /// Unique key already taken
    #[error("conflict: {0}")]
    Conflict(String),

    /// Row data that no longer decodes
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait Store: Send + Sync {
    // ── Ownership and membership ────────────────────────────────────────

    /// Whether `user_id` owns the resource. Tasks count only while not
    /// deleted; teams are owned by their `Admin` members.
    async fn is_owner(&self, user_id: &str, resource: &Resource) -> Result<bool, StoreError>;

    /// Teams `user_id` belongs to, in any role
    async fn teams_of(&self, user_id: &str) -> Result<Vec<String>, StoreError>;

    // ── Access control entries ──────────────────────────────────────────

    /// Insert, or overwrite permissions/expiry/metadata of the entry with
    /// the same resource and grantee. Returns the stored row.
    async fn upsert_ace(&self, ace: AccessControlEntry) -> Result<AccessControlEntry, StoreError>;

    /// Remove the entry for `grantee` on `resource`. Returns whether a row
    /// was removed.
    async fn delete_ace(&self, resource: &Resource, grantee: &Grantee) -> Result<bool, StoreError>;

    /// Entries on `resource` still active at `now`, newest grant first
    async fn list_aces(
        &self,
        resource: &Resource,
        now: DateTime<Utc>,
    ) -> Result<Vec<AccessControlEntry>, StoreError>;

    /// Active entries that name `user_id`, one of `teams`, or the public
    async fn aces_for_principal(
        &self,
        user_id: &str,
        teams: &[String],
        resource_type: Option<ResourceType>,
        now: DateTime<Utc>,
    ) -> Result<Vec<AccessControlEntry>, StoreError>;

    /// Active entries created by `user_id`, newest grant first
    async fn aces_granted_by(
        &self,
        user_id: &str,
        resource_type: Option<ResourceType>,
        now: DateTime<Utc>,
    ) -> Result<Vec<AccessControlEntry>, StoreError>;

    // ── Tasks ───────────────────────────────────────────────────────────

    /// Insert a new task with its CREATED event. Fails with
    /// [`StoreError::Conflict`] when the id is taken.
    async fn insert_task(&self, task: &Task, event: TaskEvent) -> Result<TaskEvent, StoreError>;

    /// Lock the task row, apply `change`, append the event. `None` when
    /// the task is absent or deleted, or when a delete comes from someone
    /// other than the row's owner.
    async fn apply_change(
        &self,
        task_id: &str,
        actor_id: &str,
        change: &TaskChange,
        now: DateTime<Utc>,
    ) -> Result<Option<(Task, TaskEvent)>, StoreError>;

    /// Task by id, deleted or not
    async fn get_task(&self, task_id: &str) -> Result<Option<Task>, StoreError>;

    /// Active tasks of `owner_id`, newest first
    async fn list_tasks(&self, owner_id: &str) -> Result<Vec<Task>, StoreError>;

    /// Tasks of `owner_id` with `version > min_version`, ascending by
    /// version. Deleted tasks are included.
    async fn changes_since(&self, owner_id: &str, min_version: i64) -> Result<Vec<Task>, StoreError>;

    /// Event log of one task in sequence order
    async fn task_events(&self, task_id: &str) -> Result<Vec<TaskEvent>, StoreError>;
}

/// Run a store call under `limit`. Expiry surfaces as
/// [`StoreError::Timeout`] and is never retried here.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}
