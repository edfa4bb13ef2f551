//! Access control entries and the request/response shapes around them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;
use crate::shared::permission::{Grantee, GranteeType, PermissionSet, ResourceType};

/// A resource addressed by id and type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resource {
    pub resource_id: String,
    pub resource_type: ResourceType,
}

impl Resource {
    pub fn new(resource_id: impl Into<String>, resource_type: ResourceType) -> Self {
        Self {
            resource_id: resource_id.into(),
            resource_type,
        }
    }

    pub fn task(task_id: impl Into<String>) -> Self {
        Self::new(task_id, ResourceType::Task)
    }
}

/// One grant of permissions on a resource
///
/// At most one entry exists per `(resource_id, resource_type, grantee_type,
/// grantee_id)`. An entry whose `expires_at` has passed is treated as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessControlEntry {
    pub id: Uuid,
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub grantee_type: GranteeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grantee_id: Option<String>,
    pub permissions: PermissionSet,
    pub granted_by: String,
    pub granted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl AccessControlEntry {
    /// Build a fresh entry for a validated grantee
    pub fn new(
        resource: &Resource,
        grantee: &Grantee,
        permissions: PermissionSet,
        granted_by: impl Into<String>,
        granted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            resource_id: resource.resource_id.clone(),
            resource_type: resource.resource_type,
            grantee_type: grantee.grantee_type(),
            grantee_id: grantee.id().map(str::to_string),
            permissions,
            granted_by: granted_by.into(),
            granted_at,
            expires_at: None,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_expiry(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn resource(&self) -> Resource {
        Resource::new(self.resource_id.clone(), self.resource_type)
    }

    /// Validated view of the grantee columns
    pub fn grantee(&self) -> Result<Grantee, SharedError> {
        Grantee::new(self.grantee_type, self.grantee_id.clone())
    }

    /// An entry is active until `expires_at` (exclusive)
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at > now)
    }

    /// Whether this entry applies to `user_id`, given the user's teams
    pub fn applies_to(&self, user_id: &str, teams: &[String]) -> bool {
        match (self.grantee_type, self.grantee_id.as_deref()) {
            (GranteeType::Public, _) => true,
            (GranteeType::User, Some(id)) => id == user_id,
            (GranteeType::Team, Some(id)) => teams.iter().any(|team| team == id),
            _ => false,
        }
    }

    /// Same identity key as `other` (resource + grantee)
    pub fn same_key(&self, other: &AccessControlEntry) -> bool {
        self.resource_id == other.resource_id
            && self.resource_type == other.resource_type
            && self.grantee_type == other.grantee_type
            && self.grantee_id == other.grantee_id
    }
}

/// Body of `POST /api/acl`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantRequest {
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub grantee_type: GranteeType,
    #[serde(default)]
    pub grantee_id: Option<String>,
    pub permissions: PermissionSet,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// One target of a batch share
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareTarget {
    #[serde(rename = "type")]
    pub grantee_type: GranteeType,
    #[serde(default)]
    pub id: Option<String>,
    /// Role name or bitmask
    pub role: PermissionSet,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Body of `POST /api/share`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareRequest {
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub share_with: Vec<ShareTarget>,
}

/// A resource somebody shared, as seen from either side of the grant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedResource {
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub permissions: PermissionSet,
    pub shared_by: String,
    pub shared_at: DateTime<Utc>,
}
