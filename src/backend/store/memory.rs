//! In-memory store
//!
//! All tables live behind one `RwLock`; holding the write guard for the
//! whole of a method is what makes each call a transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{Store, StoreError};
use crate::shared::acl::{AccessControlEntry, Resource};
use crate::shared::permission::{Grantee, ResourceType};
use crate::shared::task::{Task, TaskChange, TaskEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamRole {
    Admin,
    Member,
}

#[derive(Debug, Default)]
struct Tables {
    tasks: HashMap<String, Task>,
    events: Vec<TaskEvent>,
    last_sequence: i64,
    aces: Vec<AccessControlEntry>,
    /// team id -> user id -> role
    teams: HashMap<String, HashMap<String, TeamRole>>,
    /// owners of non-task resources (farm areas, documents)
    owners: HashMap<(ResourceType, String), String>,
    unavailable: bool,
}

impl Tables {
    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("memory store marked unavailable".into()));
        }
        Ok(())
    }

    fn append_event(&mut self, mut event: TaskEvent) -> TaskEvent {
        self.last_sequence += 1;
        event.sequence_number = self.last_sequence;
        self.events.push(event.clone());
        event
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `user_id` as a member of `team_id`
    pub async fn add_team_member(&self, team_id: &str, user_id: &str, role: TeamRole) {
        let mut tables = self.tables.write().await;
        tables
            .teams
            .entry(team_id.to_string())
            .or_default()
            .insert(user_id.to_string(), role);
    }

    /// Register the owner of a farm area or document. Tasks carry their
    /// owner on the row and teams are owned by their admins, so both are
    /// ignored here.
    pub async fn set_owner(&self, resource: &Resource, owner_id: &str) {
        if matches!(resource.resource_type, ResourceType::Task | ResourceType::Team) {
            return;
        }
        let mut tables = self.tables.write().await;
        tables.owners.insert(
            (resource.resource_type, resource.resource_id.clone()),
            owner_id.to_string(),
        );
    }

    /// Make every call fail with [`StoreError::Unavailable`]
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.tables.write().await.unavailable = unavailable;
    }

    /// Number of stored entries, expired ones included
    pub async fn ace_count(&self) -> usize {
        self.tables.read().await.aces.len()
    }
}

fn filter_type(ace: &AccessControlEntry, resource_type: Option<ResourceType>) -> bool {
    resource_type.map_or(true, |wanted| ace.resource_type == wanted)
}

fn newest_first(mut aces: Vec<AccessControlEntry>) -> Vec<AccessControlEntry> {
    aces.sort_by(|a, b| b.granted_at.cmp(&a.granted_at));
    aces
}

#[async_trait]
impl Store for MemoryStore {
    async fn is_owner(&self, user_id: &str, resource: &Resource) -> Result<bool, StoreError> {
        let tables = self.tables.read().await;
        tables.ensure_available()?;
        let owned = match resource.resource_type {
            ResourceType::Task => tables
                .tasks
                .get(&resource.resource_id)
                .is_some_and(|task| !task.is_deleted() && task.owner_id == user_id),
            ResourceType::Team => tables
                .teams
                .get(&resource.resource_id)
                .and_then(|members| members.get(user_id))
                .is_some_and(|role| *role == TeamRole::Admin),
            ResourceType::FarmArea | ResourceType::Document => tables
                .owners
                .get(&(resource.resource_type, resource.resource_id.clone()))
                .is_some_and(|owner| owner == user_id),
        };
        Ok(owned)
    }

    async fn teams_of(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.read().await;
        tables.ensure_available()?;
        let mut teams: Vec<String> = tables
            .teams
            .iter()
            .filter(|(_, members)| members.contains_key(user_id))
            .map(|(team, _)| team.clone())
            .collect();
        teams.sort();
        Ok(teams)
    }

    async fn upsert_ace(&self, ace: AccessControlEntry) -> Result<AccessControlEntry, StoreError> {
        let mut tables = self.tables.write().await;
        tables.ensure_available()?;
        if let Some(existing) = tables.aces.iter_mut().find(|row| row.same_key(&ace)) {
            existing.permissions = ace.permissions;
            existing.expires_at = ace.expires_at;
            existing.metadata = ace.metadata;
            existing.granted_by = ace.granted_by;
            existing.granted_at = ace.granted_at;
            return Ok(existing.clone());
        }
        tables.aces.push(ace.clone());
        Ok(ace)
    }

    async fn delete_ace(&self, resource: &Resource, grantee: &Grantee) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        tables.ensure_available()?;
        let before = tables.aces.len();
        tables.aces.retain(|ace| {
            !(ace.resource_id == resource.resource_id
                && ace.resource_type == resource.resource_type
                && ace.grantee_type == grantee.grantee_type()
                && ace.grantee_id.as_deref() == grantee.id())
        });
        Ok(tables.aces.len() != before)
    }

    async fn list_aces(
        &self,
        resource: &Resource,
        now: DateTime<Utc>,
    ) -> Result<Vec<AccessControlEntry>, StoreError> {
        let tables = self.tables.read().await;
        tables.ensure_available()?;
        let rows = tables
            .aces
            .iter()
            .filter(|ace| {
                ace.resource_id == resource.resource_id
                    && ace.resource_type == resource.resource_type
                    && ace.is_active(now)
            })
            .cloned()
            .collect();
        Ok(newest_first(rows))
    }

    async fn aces_for_principal(
        &self,
        user_id: &str,
        teams: &[String],
        resource_type: Option<ResourceType>,
        now: DateTime<Utc>,
    ) -> Result<Vec<AccessControlEntry>, StoreError> {
        let tables = self.tables.read().await;
        tables.ensure_available()?;
        let rows = tables
            .aces
            .iter()
            .filter(|ace| {
                filter_type(ace, resource_type) && ace.is_active(now) && ace.applies_to(user_id, teams)
            })
            .cloned()
            .collect();
        Ok(newest_first(rows))
    }

    async fn aces_granted_by(
        &self,
        user_id: &str,
        resource_type: Option<ResourceType>,
        now: DateTime<Utc>,
    ) -> Result<Vec<AccessControlEntry>, StoreError> {
        let tables = self.tables.read().await;
        tables.ensure_available()?;
        let rows = tables
            .aces
            .iter()
            .filter(|ace| ace.granted_by == user_id && filter_type(ace, resource_type) && ace.is_active(now))
            .cloned()
            .collect();
        Ok(newest_first(rows))
    }

    async fn insert_task(&self, task: &Task, event: TaskEvent) -> Result<TaskEvent, StoreError> {
        let mut tables = self.tables.write().await;
        tables.ensure_available()?;
        if tables.tasks.contains_key(&task.id) {
            return Err(StoreError::Conflict(format!("task {} already exists", task.id)));
        }
        tables.tasks.insert(task.id.clone(), task.clone());
        Ok(tables.append_event(event))
    }

    async fn apply_change(
        &self,
        task_id: &str,
        actor_id: &str,
        change: &TaskChange,
        now: DateTime<Utc>,
    ) -> Result<Option<(Task, TaskEvent)>, StoreError> {
        let mut tables = self.tables.write().await;
        tables.ensure_available()?;

        let Some(task) = tables.tasks.get(task_id) else {
            return Ok(None);
        };
        if task.is_deleted() {
            return Ok(None);
        }
        if matches!(change, TaskChange::Delete) && task.owner_id != actor_id {
            return Ok(None);
        }

        let mut updated = task.clone();
        let event = updated
            .apply_change(actor_id, change, now)
            .map_err(|e| StoreError::Corrupt(format!("event payload for {}: {}", task_id, e)))?;
        tables.tasks.insert(updated.id.clone(), updated.clone());
        let event = tables.append_event(event);
        Ok(Some((updated, event)))
    }

    async fn get_task(&self, task_id: &str) -> Result<Option<Task>, StoreError> {
        let tables = self.tables.read().await;
        tables.ensure_available()?;
        Ok(tables.tasks.get(task_id).cloned())
    }

    async fn list_tasks(&self, owner_id: &str) -> Result<Vec<Task>, StoreError> {
        let tables = self.tables.read().await;
        tables.ensure_available()?;
        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|task| task.owner_id == owner_id && !task.is_deleted())
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(tasks)
    }

    async fn changes_since(&self, owner_id: &str, min_version: i64) -> Result<Vec<Task>, StoreError> {
        let tables = self.tables.read().await;
        tables.ensure_available()?;
        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|task| task.owner_id == owner_id && task.version > min_version)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.id.cmp(&b.id)));
        Ok(tasks)
    }

    async fn task_events(&self, task_id: &str) -> Result<Vec<TaskEvent>, StoreError> {
        let tables = self.tables.read().await;
        tables.ensure_available()?;
        Ok(tables
            .events
            .iter()
            .filter(|event| event.task_id == task_id)
            .cloned()
            .collect())
    }
}
