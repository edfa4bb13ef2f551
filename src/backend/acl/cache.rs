//! Effective-permission cache
//!
//! Memoizes "what can user U do on resource R" for a fixed TTL. Entries
//! are advisory: grants and revokes never touch them, so a change becomes
//! visible to a cached caller only once its entry expires. Concurrent
//! population is last-write-wins.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::shared::acl::Resource;
use crate::shared::permission::PermissionSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    user_id: String,
    resource: Resource,
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    permissions: PermissionSet,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct PermissionCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl PermissionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached set for `user_id` on `resource`, if still fresh
    pub async fn get(&self, user_id: &str, resource: &Resource) -> Option<PermissionSet> {
        let key = CacheKey {
            user_id: user_id.to_string(),
            resource: resource.clone(),
        };
        let entries = self.entries.read().await;
        entries
            .get(&key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.permissions)
    }

    /// Store `permissions` with a fresh TTL
    pub async fn insert(&self, user_id: &str, resource: &Resource, permissions: PermissionSet) {
        let key = CacheKey {
            user_id: user_id.to_string(),
            resource: resource.clone(),
        };
        let entry = CacheEntry {
            permissions,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().await.insert(key, entry);
    }

    /// Drop expired entries, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
