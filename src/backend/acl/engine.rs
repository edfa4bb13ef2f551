//! ACL engine
//!
//! Decides who may see or mutate a resource. Owners always hold
//! `FULL_ACCESS`; everyone else gets the union of the active entries that
//! name them, one of their teams, or the public. Narrower grants never
//! take access away.

use std::collections::HashMap;

use chrono::Utc;

use super::permission_store::PermissionStore;
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::middleware::AuthenticatedUser;
use crate::shared::acl::{AccessControlEntry, GrantRequest, Resource, ShareRequest, SharedResource};
use crate::shared::error::SharedError;
use crate::shared::permission::{Grantee, GranteeType, PermissionSet, ResourceType};

#[derive(Clone)]
pub struct AclEngine {
    permissions: PermissionStore,
}

impl AclEngine {
    pub fn new(permissions: PermissionStore) -> Self {
        Self { permissions }
    }

    pub fn permission_store(&self) -> &PermissionStore {
        &self.permissions
    }

    /// What `principal` may do on `resource`. Owners short-circuit to
    /// `FULL_ACCESS` without reading any entry or cache.
    pub async fn effective_permission(
        &self,
        principal: &AuthenticatedUser,
        resource: &Resource,
    ) -> BackendResult<PermissionSet> {
        if self.permissions.is_owner(&principal.user_id, resource).await? {
            return Ok(PermissionSet::FULL_ACCESS);
        }
        self.permissions
            .compute_or_fetch(&principal.user_id, resource)
            .await
    }

    pub async fn check(
        &self,
        principal: &AuthenticatedUser,
        resource: &Resource,
        required: PermissionSet,
    ) -> BackendResult<bool> {
        Ok(self.effective_permission(principal, resource).await?.has(required))
    }

    /// Effective permission, or `PermissionDenied` when `required` is missing
    pub async fn require(
        &self,
        principal: &AuthenticatedUser,
        resource: &Resource,
        required: PermissionSet,
    ) -> BackendResult<PermissionSet> {
        let effective = self.effective_permission(principal, resource).await?;
        if effective.has(required) {
            return Ok(effective);
        }
        tracing::info!(
            "[ACL] denied {} on {}:{} (has {}, needs {})",
            principal.user_id,
            resource.resource_type,
            resource.resource_id,
            effective,
            required
        );
        Err(BackendError::permission_denied(format!(
            "{} permission required on {} {}",
            required, resource.resource_type, resource.resource_id
        )))
    }

    /// Passes when the principal holds at least one of `any_of`
    async fn require_any(
        &self,
        principal: &AuthenticatedUser,
        resource: &Resource,
        any_of: &[PermissionSet],
        action: &str,
    ) -> BackendResult<()> {
        let effective = self.effective_permission(principal, resource).await?;
        if any_of.iter().any(|required| effective.has(*required)) {
            return Ok(());
        }
        tracing::info!(
            "[ACL] {} may not {} on {}:{} (has {})",
            principal.user_id,
            action,
            resource.resource_type,
            resource.resource_id,
            effective
        );
        Err(BackendError::permission_denied(format!(
            "not allowed to {} on {} {}",
            action, resource.resource_type, resource.resource_id
        )))
    }

    /// Create or overwrite the entry for one grantee. Needs SHARE or
    /// ownership; the grantee shape is checked after authorization.
    pub async fn grant(
        &self,
        actor: &AuthenticatedUser,
        request: GrantRequest,
    ) -> BackendResult<AccessControlEntry> {
        let resource = Resource::new(request.resource_id, request.resource_type);
        self.require_any(actor, &resource, &[PermissionSet::SHARE], "share")
            .await?;

        let grantee = Grantee::new(request.grantee_type, request.grantee_id)?;
        let ace = AccessControlEntry::new(&resource, &grantee, request.permissions, &actor.user_id, Utc::now())
            .with_expiry(request.expires_at)
            .with_metadata(request.metadata.unwrap_or_default());

        let stored = self.permissions.upsert(ace).await?;
        tracing::info!(
            "[ACL] {} granted {} on {}:{} to {} {}",
            actor.user_id,
            stored.permissions,
            stored.resource_type,
            stored.resource_id,
            stored.grantee_type,
            stored.grantee_id.as_deref().unwrap_or("*")
        );
        Ok(stored)
    }

    /// Grant named roles to several grantees under one authorization check.
    /// Every target is validated before anything is written.
    pub async fn share(
        &self,
        actor: &AuthenticatedUser,
        request: ShareRequest,
    ) -> BackendResult<Vec<AccessControlEntry>> {
        let resource = Resource::new(request.resource_id, request.resource_type);
        self.require_any(actor, &resource, &[PermissionSet::SHARE], "share")
            .await?;

        if request.share_with.is_empty() {
            return Err(SharedError::validation("share_with", "at least one target is required").into());
        }

        let now = Utc::now();
        let entries = request
            .share_with
            .into_iter()
            .map(|target| -> Result<AccessControlEntry, SharedError> {
                let grantee = Grantee::new(target.grantee_type, target.id)?;
                Ok(AccessControlEntry::new(&resource, &grantee, target.role, &actor.user_id, now)
                    .with_expiry(target.expires_at))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut stored = Vec::with_capacity(entries.len());
        for ace in entries {
            stored.push(self.permissions.upsert(ace).await?);
        }
        tracing::info!(
            "[ACL] {} shared {}:{} with {} grantee(s)",
            actor.user_id,
            resource.resource_type,
            resource.resource_id,
            stored.len()
        );
        Ok(stored)
    }

    /// Remove a grantee's entry. Needs ADMIN, SHARE or ownership. Revoking
    /// an entry that does not exist succeeds.
    pub async fn revoke(
        &self,
        actor: &AuthenticatedUser,
        resource: &Resource,
        grantee_type: GranteeType,
        grantee_id: Option<String>,
    ) -> BackendResult<()> {
        self.require_any(
            actor,
            resource,
            &[PermissionSet::ADMIN, PermissionSet::SHARE],
            "revoke",
        )
        .await?;

        let grantee = Grantee::new(grantee_type, grantee_id)?;
        let removed = self.permissions.remove(resource, &grantee).await?;
        tracing::info!(
            "[ACL] {} revoked {} {} on {}:{} (removed: {})",
            actor.user_id,
            grantee.grantee_type(),
            grantee.id().unwrap_or("*"),
            resource.resource_type,
            resource.resource_id,
            removed
        );
        Ok(())
    }

    /// Active entries on a resource. Needs READ or ownership.
    pub async fn list_grants(
        &self,
        actor: &AuthenticatedUser,
        resource: &Resource,
    ) -> BackendResult<Vec<AccessControlEntry>> {
        self.require(actor, resource, PermissionSet::READ).await?;
        self.permissions.grants_on(resource).await
    }

    /// Resources other users shared with `principal`, one row per resource
    pub async fn list_shared_with_me(
        &self,
        principal: &AuthenticatedUser,
        resource_type: Option<ResourceType>,
    ) -> BackendResult<Vec<SharedResource>> {
        let entries = self
            .permissions
            .grants_reaching(&principal.user_id, resource_type)
            .await?;
        Ok(summarize(entries))
    }

    /// Resources `principal` shared with others, one row per resource
    pub async fn list_shared_by_me(
        &self,
        principal: &AuthenticatedUser,
        resource_type: Option<ResourceType>,
    ) -> BackendResult<Vec<SharedResource>> {
        let entries = self
            .permissions
            .grants_by(&principal.user_id, resource_type)
            .await?;
        Ok(summarize(entries))
    }

    /// Replace the permissions of an existing grantee, keeping its expiry
    /// and metadata
    pub async fn update_permissions(
        &self,
        actor: &AuthenticatedUser,
        resource: &Resource,
        grantee: Grantee,
        permissions: PermissionSet,
    ) -> BackendResult<AccessControlEntry> {
        self.require_any(actor, resource, &[PermissionSet::SHARE], "share")
            .await?;

        let existing = self
            .permissions
            .grants_on(resource)
            .await?
            .into_iter()
            .find(|ace| ace.grantee_type == grantee.grantee_type() && ace.grantee_id.as_deref() == grantee.id());

        let mut ace = AccessControlEntry::new(resource, &grantee, permissions, &actor.user_id, Utc::now());
        if let Some(existing) = existing {
            ace = ace
                .with_expiry(existing.expires_at)
                .with_metadata(existing.metadata);
        }
        self.permissions.upsert(ace).await
    }
}

/// Collapse entries to one row per resource: permissions are unioned and
/// the first grant gives the share time and the sharer. Newest first.
fn summarize(entries: Vec<AccessControlEntry>) -> Vec<SharedResource> {
    let mut index: HashMap<Resource, usize> = HashMap::new();
    let mut shared: Vec<SharedResource> = Vec::new();

    for ace in entries {
        let key = ace.resource();
        match index.get(&key) {
            Some(&position) => {
                let row = &mut shared[position];
                row.permissions |= ace.permissions;
                if ace.granted_at < row.shared_at {
                    row.shared_at = ace.granted_at;
                    row.shared_by = ace.granted_by;
                }
            }
            None => {
                index.insert(key, shared.len());
                shared.push(SharedResource {
                    resource_id: ace.resource_id,
                    resource_type: ace.resource_type,
                    permissions: ace.permissions,
                    shared_by: ace.granted_by,
                    shared_at: ace.granted_at,
                });
            }
        }
    }

    shared.sort_by(|a, b| b.shared_at.cmp(&a.shared_at));
    shared
}
