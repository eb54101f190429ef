// src/services/snapshot_cache.rs

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::permission::PermissionSnapshot;

struct CachedSnapshot {
    snapshot: Arc<PermissionSnapshot>,
    cached_at: Instant,
}

/// Cache em memória dos snapshots, por (restaurante, usuário).
/// Uma entrada só vale enquanto a `perm_version` guardada for a atual, o flag de
/// superadmin for o mesmo do usuário carregado na requisição e o TTL não venceu.
pub struct SnapshotCache {
    ttl: Duration,
    entries: RwLock<HashMap<(Uuid, Uuid), CachedSnapshot>>,
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: RwLock::new(HashMap::new()) }
    }

    pub async fn get(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        current_version: i32,
        is_superadmin: bool,
    ) -> Option<Arc<PermissionSnapshot>> {
        let entries = self.entries.read().await;
        let cached = entries.get(&(restaurant_id, user_id))?;

        if cached.snapshot.perm_version != current_version {
            tracing::debug!(
                %restaurant_id,
                %user_id,
                cached_version = cached.snapshot.perm_version,
                current_version,
                "Snapshot de permissões desatualizado"
            );
            return None;
        }
        if cached.snapshot.is_superadmin != is_superadmin {
            tracing::debug!(%restaurant_id, %user_id, "Flag de superadmin mudou desde o snapshot");
            return None;
        }
        if cached.cached_at.elapsed() >= self.ttl {
            tracing::debug!(%restaurant_id, %user_id, "Snapshot de permissões expirado");
            return None;
        }

        Some(Arc::clone(&cached.snapshot))
    }

    pub async fn insert(&self, snapshot: PermissionSnapshot) -> Arc<PermissionSnapshot> {
        let key = (snapshot.restaurant_id, snapshot.user_id);
        let snapshot = Arc::new(snapshot);
        let mut entries = self.entries.write().await;

        // Expirados saem aqui; `get` só os ignora
        let ttl = self.ttl;
        entries.retain(|_, cached| cached.cached_at.elapsed() < ttl);

        // Um snapshot montado com versão mais antiga não substitui um mais novo
        if let Some(existing) = entries.get(&key) {
            if existing.snapshot.perm_version > snapshot.perm_version {
                return snapshot;
            }
        }

        entries.insert(
            key,
            CachedSnapshot { snapshot: Arc::clone(&snapshot), cached_at: Instant::now() },
        );
        snapshot
    }

    /// Descarta todos os snapshots do restaurante.
    pub async fn invalidate_restaurant(&self, restaurant_id: Uuid) {
        let mut entries = self.entries.write().await;
        entries.retain(|(rid, _), _| *rid != restaurant_id);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(restaurant_id: Uuid, user_id: Uuid, perm_version: i32) -> PermissionSnapshot {
        PermissionSnapshot {
            restaurant_id,
            user_id,
            perm_version,
            is_superadmin: false,
            is_owner: false,
            modules: Vec::new(),
        }
    }

    #[tokio::test]
    async fn returns_snapshot_only_for_current_version() {
        let cache = SnapshotCache::new(Duration::from_secs(3600));
        let (restaurant, user) = (Uuid::new_v4(), Uuid::new_v4());
        cache.insert(snapshot(restaurant, user, 3)).await;

        assert!(cache.get(restaurant, user, 3, false).await.is_some());
        assert!(cache.get(restaurant, user, 4, false).await.is_none());
        assert!(cache.get(restaurant, Uuid::new_v4(), 3, false).await.is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let cache = SnapshotCache::new(Duration::ZERO);
        let (restaurant, user) = (Uuid::new_v4(), Uuid::new_v4());
        cache.insert(snapshot(restaurant, user, 1)).await;
        assert!(cache.get(restaurant, user, 1, false).await.is_none());
    }

    #[tokio::test]
    async fn invalidation_drops_only_that_restaurant() {
        let cache = SnapshotCache::new(Duration::from_secs(3600));
        let (a, b, user) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        cache.insert(snapshot(a, user, 1)).await;
        cache.insert(snapshot(a, Uuid::new_v4(), 1)).await;
        cache.insert(snapshot(b, user, 1)).await;

        cache.invalidate_restaurant(a).await;

        assert_eq!(cache.len().await, 1);
        assert!(cache.get(b, user, 1, false).await.is_some());
    }

    #[tokio::test]
    async fn older_snapshot_does_not_replace_newer_one() {
        let cache = SnapshotCache::new(Duration::from_secs(3600));
        let (restaurant, user) = (Uuid::new_v4(), Uuid::new_v4());
        cache.insert(snapshot(restaurant, user, 5)).await;
        cache.insert(snapshot(restaurant, user, 4)).await;

        assert!(cache.get(restaurant, user, 5, false).await.is_some());
    }

    #[tokio::test]
    async fn superadmin_flag_change_is_a_miss() {
        let cache = SnapshotCache::new(Duration::from_secs(3600));
        let (restaurant, user) = (Uuid::new_v4(), Uuid::new_v4());
        cache.insert(snapshot(restaurant, user, 2)).await;

        assert!(cache.get(restaurant, user, 2, false).await.is_some());
        assert!(cache.get(restaurant, user, 2, true).await.is_none());
    }

    #[tokio::test]
    async fn insert_sweeps_expired_entries() {
        let cache = SnapshotCache::new(Duration::ZERO);
        for _ in 0..5 {
            cache.insert(snapshot(Uuid::new_v4(), Uuid::new_v4(), 1)).await;
        }
        // Só sobra o último inserido; os anteriores já tinham vencido
        assert_eq!(cache.len().await, 1);
    }
}
