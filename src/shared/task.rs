//! Task domain model
//!
//! Tasks are the canonical shareable resource. Every accepted mutation moves
//! `version` forward by exactly one and ticks the acting user's entry in the
//! vector clock by exactly one. The clock is bookkeeping only: concurrent
//! writers both succeed and the later write's fields win.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;

const MIN_TITLE_LEN: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
    Canceled,
}

impl TaskPriority {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub fn parse(value: &str) -> Result<Self, SharedError> {
        match value {
            "Low" => Ok(Self::Low),
            "Medium" => Ok(Self::Medium),
            "High" => Ok(Self::High),
            other => Err(SharedError::validation(
                "priority",
                format!("expected Low, Medium or High, got {}", other),
            )),
        }
    }
}

impl TaskStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "InProgress",
            Self::Done => "Done",
            Self::Canceled => "Canceled",
        }
    }

    pub fn parse(value: &str) -> Result<Self, SharedError> {
        match value {
            "Pending" => Ok(Self::Pending),
            "InProgress" => Ok(Self::InProgress),
            "Done" => Ok(Self::Done),
            "Canceled" => Ok(Self::Canceled),
            other => Err(SharedError::validation(
                "status",
                format!("expected Pending, InProgress, Done or Canceled, got {}", other),
            )),
        }
    }
}

/// Per-actor mutation counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorClock(BTreeMap<String, i64>);

impl VectorClock {
    /// Clock of a freshly created resource: `{owner: 1}`
    pub fn started_by(actor_id: &str) -> Self {
        let mut clock = Self::default();
        clock.tick(actor_id);
        clock
    }

    /// Increment `actor_id`'s counter, starting from zero when absent.
    /// Returns the new value.
    pub fn tick(&mut self, actor_id: &str) -> i64 {
        let counter = self.0.entry(actor_id.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    pub fn get(&self, actor_id: &str) -> i64 {
        self.0.get(actor_id).copied().unwrap_or(0)
    }

    pub fn actors(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(actor, count)| (actor.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, i64)> for VectorClock {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub version: i64,
    #[serde(rename = "vector_clock")]
    pub clock: VectorClock,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Task {
    /// A new task owned by `owner_id`, at version 1 with clock `{owner: 1}`
    pub fn create(
        id: Option<String>,
        owner_id: &str,
        request: CreateTaskRequest,
        now: DateTime<Utc>,
    ) -> Result<Self, SharedError> {
        request.validate()?;
        let id = match id {
            Some(id) if id.trim().is_empty() => {
                return Err(SharedError::validation("id", "task id cannot be empty"))
            }
            Some(id) => id,
            None => Uuid::new_v4().to_string(),
        };
        Ok(Self {
            id,
            title: request.title,
            description: request.description,
            priority: request.priority,
            status: TaskStatus::Pending,
            owner_id: owner_id.to_string(),
            due_date: request.due_date,
            version: 1,
            clock: VectorClock::started_by(owner_id),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Overwrite the supplied fields and advance version and clock
    pub fn apply_update(&mut self, actor_id: &str, mutation: &TaskMutation, now: DateTime<Utc>) {
        if let Some(title) = &mutation.title {
            self.title = title.clone();
        }
        if let Some(description) = &mutation.description {
            self.description = description.clone();
        }
        if let Some(priority) = mutation.priority {
            self.priority = priority;
        }
        if let Some(status) = mutation.status {
            self.status = status;
        }
        if let Some(due_date) = mutation.due_date {
            self.due_date = Some(due_date);
        }
        self.advance(actor_id, now);
    }

    /// Soft delete; a deleted task never changes again
    pub fn mark_deleted(&mut self, actor_id: &str, now: DateTime<Utc>) {
        self.deleted_at = Some(now);
        self.advance(actor_id, now);
    }

    fn advance(&mut self, actor_id: &str, now: DateTime<Utc>) {
        self.version += 1;
        self.clock.tick(actor_id);
        self.updated_at = now;
    }

    /// Apply `change` and return the event row that must be committed with it.
    /// The task is left untouched when the event payload cannot be encoded.
    pub fn apply_change(
        &mut self,
        actor_id: &str,
        change: &TaskChange,
        now: DateTime<Utc>,
    ) -> Result<TaskEvent, serde_json::Error> {
        match change {
            TaskChange::Update(mutation) => {
                let payload = serde_json::to_value(mutation)?;
                self.apply_update(actor_id, mutation, now);
                Ok(TaskEvent::for_task(self, TaskEventType::Updated, actor_id, payload))
            }
            TaskChange::Delete => {
                self.mark_deleted(actor_id, now);
                let payload = serde_json::json!({ "deleted_at": now.to_rfc3339() });
                Ok(TaskEvent::for_task(self, TaskEventType::Deleted, actor_id, payload))
            }
        }
    }
}

/// A mutation of an existing task
#[derive(Debug, Clone, PartialEq)]
pub enum TaskChange {
    Update(TaskMutation),
    Delete,
}

/// Fields accepted when creating a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

impl CreateTaskRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            priority: TaskPriority::default(),
            due_date: None,
        }
    }

    pub fn validate(&self) -> Result<(), SharedError> {
        validate_title(&self.title)
    }
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskMutation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskMutation {
    pub fn validate(&self) -> Result<(), SharedError> {
        match &self.title {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }
}

fn validate_title(title: &str) -> Result<(), SharedError> {
    if title.trim().chars().count() < MIN_TITLE_LEN {
        return Err(SharedError::validation(
            "title",
            format!("title must be at least {} characters", MIN_TITLE_LEN),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskEventType {
    Created,
    Updated,
    Deleted,
}

impl TaskEventType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Updated => "UPDATED",
            Self::Deleted => "DELETED",
        }
    }

    pub fn parse(value: &str) -> Result<Self, SharedError> {
        match value {
            "CREATED" => Ok(Self::Created),
            "UPDATED" => Ok(Self::Updated),
            "DELETED" => Ok(Self::Deleted),
            other => Err(SharedError::validation(
                "event_type",
                format!("unknown task event type: {}", other),
            )),
        }
    }
}

impl fmt::Display for TaskEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only record of one accepted mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub id: Uuid,
    pub task_id: String,
    pub event_type: TaskEventType,
    pub payload: serde_json::Value,
    pub version: i64,
    #[serde(rename = "vector_clock")]
    pub clock: VectorClock,
    pub actor_id: String,
    /// Global order across all tasks; assigned by the store on append
    pub sequence_number: i64,
    pub created_at: DateTime<Utc>,
}

impl TaskEvent {
    /// Event describing `task` as it stands after the mutation. The
    /// sequence number is filled in when the store appends it.
    pub fn for_task(
        task: &Task,
        event_type: TaskEventType,
        actor_id: &str,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id: task.id.clone(),
            event_type,
            payload,
            version: task.version,
            clock: task.clock.clone(),
            actor_id: actor_id.to_string(),
            sequence_number: 0,
            created_at: task.updated_at,
        }
    }
}
