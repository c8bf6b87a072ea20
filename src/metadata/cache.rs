//! Run-scoped cache for server roles and member lookups

use crate::discord::{Member, Role, ServerId, UserId};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    ServerRoles(ServerId),
    ServerMember(ServerId, UserId),
}

impl CacheKey {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ServerRoles(_) => "server-roles",
            Self::ServerMember(..) => "server-member",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Roles(Arc<Vec<Role>>),
    Member(Arc<Member>),
}

/// Cache statistics for monitoring
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> u32 {
        let lookups = self.hits + self.misses;
        if lookups > 0 {
            (self.hits as f32 / lookups as f32 * 100.0) as u32
        } else {
            0
        }
    }
}

/// Metadata cache keyed by (kind, id)
///
/// Entries are never evicted or expired: the cache lives for a single retrieval
/// run and holds one entry per distinct server or author touched. Values for a
/// key are identical across a run, so concurrent writers may overwrite each other.
#[derive(Default)]
pub struct MetadataCache {
    entries: DashMap<CacheKey, CacheValue>,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        match self.entries.get(key) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(kind = key.kind(), "Metadata cache hit");
                Some(value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, key: CacheKey, value: CacheValue) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(key, value);
    }

    pub fn roles(&self, server_id: &ServerId) -> Option<Arc<Vec<Role>>> {
        match self.get(&CacheKey::ServerRoles(server_id.clone()))? {
            CacheValue::Roles(roles) => Some(roles),
            CacheValue::Member(_) => None,
        }
    }

    pub fn put_roles(&self, server_id: &ServerId, roles: Vec<Role>) -> Arc<Vec<Role>> {
        let roles = Arc::new(roles);
        self.put(
            CacheKey::ServerRoles(server_id.clone()),
            CacheValue::Roles(roles.clone()),
        );
        roles
    }

    pub fn member(&self, server_id: &ServerId, user_id: &UserId) -> Option<Arc<Member>> {
        match self.get(&CacheKey::ServerMember(server_id.clone(), user_id.clone()))? {
            CacheValue::Member(member) => Some(member),
            CacheValue::Roles(_) => None,
        }
    }

    pub fn put_member(&self, server_id: &ServerId, user_id: &UserId, member: Member) -> Arc<Member> {
        let member = Arc::new(member);
        self.put(
            CacheKey::ServerMember(server_id.clone(), user_id.clone()),
            CacheValue::Member(member.clone()),
        );
        member
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
        }
    }

    /// Log cache statistics at the end of a run
    pub fn log_stats(&self) {
        let stats = self.stats();
        tracing::info!(
            entries = self.len(),
            hits = stats.hits,
            misses = stats.misses,
            hit_rate = stats.hit_rate(),
            "Metadata cache statistics"
        );
    }
}
