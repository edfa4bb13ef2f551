//! Offline sync wire types

use serde::{Deserialize, Serialize};

use crate::shared::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncChangeType {
    #[serde(alias = "create", alias = "CREATE")]
    Create,
    #[serde(alias = "update", alias = "UPDATE")]
    Update,
    #[serde(alias = "delete", alias = "DELETE")]
    Delete,
}

/// One mutation queued by a client while offline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncChange {
    #[serde(rename = "type")]
    pub change_type: SyncChangeType,
    /// Target task. Optional for `Create`, where it becomes the new id.
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Body of `POST /api/tasks/sync`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub last_pulled_version: i64,
    #[serde(default)]
    pub changes: Vec<SyncChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResponse {
    /// Changes applied; failed changes are not counted
    pub synced_count: usize,
    /// Owner's tasks above `last_pulled_version`, ascending by version
    pub new_resources: Vec<Task>,
}
