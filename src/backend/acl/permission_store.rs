//! Permission store
//!
//! Wraps the authoritative ACE rows and the effective-permission cache.
//! Every store call is bounded by the configured timeout.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::cache::PermissionCache;
use crate::backend::error::BackendResult;
use crate::backend::store::{bounded, Store};
use crate::shared::acl::{AccessControlEntry, Resource};
use crate::shared::permission::{Grantee, PermissionSet, ResourceType};

#[derive(Clone)]
pub struct PermissionStore {
    store: Arc<dyn Store>,
    cache: Arc<PermissionCache>,
    timeout: Duration,
}

impl PermissionStore {
    pub fn new(store: Arc<dyn Store>, cache_ttl: Duration, timeout: Duration) -> Self {
        Self {
            store,
            cache: Arc::new(PermissionCache::new(cache_ttl)),
            timeout,
        }
    }

    pub fn cache(&self) -> &Arc<PermissionCache> {
        &self.cache
    }

    pub async fn is_owner(&self, user_id: &str, resource: &Resource) -> BackendResult<bool> {
        Ok(bounded(self.timeout, self.store.is_owner(user_id, resource)).await?)
    }

    /// Cached effective permission, recomputed on a miss or after expiry
    pub async fn compute_or_fetch(&self, user_id: &str, resource: &Resource) -> BackendResult<PermissionSet> {
        if let Some(cached) = self.cache.get(user_id, resource).await {
            tracing::debug!(
                "[ACL] cache hit {} on {}:{} = {}",
                user_id,
                resource.resource_type,
                resource.resource_id,
                cached
            );
            return Ok(cached);
        }

        let permissions = self.compute(user_id, resource).await?;
        self.cache.insert(user_id, resource, permissions).await;
        Ok(permissions)
    }

    /// Authoritative effective permission: owner check, then the union of
    /// every active entry naming the user, one of their teams, or the public
    pub async fn compute(&self, user_id: &str, resource: &Resource) -> BackendResult<PermissionSet> {
        if self.is_owner(user_id, resource).await? {
            return Ok(PermissionSet::FULL_ACCESS);
        }

        let teams = bounded(self.timeout, self.store.teams_of(user_id)).await?;
        let entries = bounded(self.timeout, self.store.list_aces(resource, Utc::now())).await?;
        let permissions = entries
            .iter()
            .filter(|ace| ace.applies_to(user_id, &teams))
            .fold(PermissionSet::NONE, |acc, ace| acc | ace.permissions);

        tracing::debug!(
            "[ACL] computed {} on {}:{} = {}",
            user_id,
            resource.resource_type,
            resource.resource_id,
            permissions
        );
        Ok(permissions)
    }

    pub async fn upsert(&self, ace: AccessControlEntry) -> BackendResult<AccessControlEntry> {
        Ok(bounded(self.timeout, self.store.upsert_ace(ace)).await?)
    }

    pub async fn remove(&self, resource: &Resource, grantee: &Grantee) -> BackendResult<bool> {
        Ok(bounded(self.timeout, self.store.delete_ace(resource, grantee)).await?)
    }

    /// Active entries on one resource
    pub async fn grants_on(&self, resource: &Resource) -> BackendResult<Vec<AccessControlEntry>> {
        Ok(bounded(self.timeout, self.store.list_aces(resource, Utc::now())).await?)
    }

    /// Active entries that reach `user_id` directly, via a team, or publicly
    pub async fn grants_reaching(
        &self,
        user_id: &str,
        resource_type: Option<ResourceType>,
    ) -> BackendResult<Vec<AccessControlEntry>> {
        let teams = bounded(self.timeout, self.store.teams_of(user_id)).await?;
        Ok(bounded(
            self.timeout,
            self.store.aces_for_principal(user_id, &teams, resource_type, Utc::now()),
        )
        .await?)
    }

    /// Active entries created by `user_id`
    pub async fn grants_by(
        &self,
        user_id: &str,
        resource_type: Option<ResourceType>,
    ) -> BackendResult<Vec<AccessControlEntry>> {
        Ok(bounded(
            self.timeout,
            self.store.aces_granted_by(user_id, resource_type, Utc::now()),
        )
        .await?)
    }
}
