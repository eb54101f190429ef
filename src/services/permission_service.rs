// src/services/permission_service.rs

use std::sync::Arc;

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogRepository, EntitlementRepository, RbacRepository, RestaurantRepository},
    models::{
        auth::User,
        permission::{PermissionDecision, PermissionSnapshot},
    },
    services::{
        resolver::{
            build_snapshot, EntitlementMap, PermissionInputs, Principal, RoleGrants, UserOverrides,
        },
        snapshot_cache::SnapshotCache,
    },
};

#[derive(Clone)]
pub struct PermissionService {
    restaurant_repo: RestaurantRepository,
    catalog_repo: CatalogRepository,
    entitlement_repo: EntitlementRepository,
    rbac_repo: RbacRepository,
    cache: Arc<SnapshotCache>,
}

impl PermissionService {
    pub fn new(
        restaurant_repo: RestaurantRepository,
        catalog_repo: CatalogRepository,
        entitlement_repo: EntitlementRepository,
        rbac_repo: RbacRepository,
        cache: Arc<SnapshotCache>,
    ) -> Self {
        Self { restaurant_repo, catalog_repo, entitlement_repo, rbac_repo, cache }
    }

    /// Snapshot completo do usuário no restaurante (do cache, se ainda válido).
    /// `user` é o registro carregado pelos guards nesta requisição.
    pub async fn snapshot(
        &self,
        user: &User,
        restaurant_id: Uuid,
    ) -> Result<Arc<PermissionSnapshot>, AppError> {
        let user_id = user.id;
        let version = self
            .restaurant_repo
            .perm_version(restaurant_id)
            .await?
            .ok_or(AppError::RestaurantNotFound)?;

        if let Some(snapshot) = self.cache.get(restaurant_id, user_id, version, user.is_superadmin).await {
            return Ok(snapshot);
        }

        let inputs = self.load_inputs(user, restaurant_id).await?;
        let snapshot = build_snapshot(&inputs, version);

        tracing::debug!(%restaurant_id, %user_id, version, "Snapshot de permissões recalculado");
        Ok(self.cache.insert(snapshot).await)
    }

    async fn load_inputs(&self, user: &User, restaurant_id: Uuid) -> Result<PermissionInputs, AppError> {
        let user_id = user.id;
        let is_owner = self
            .restaurant_repo
            .find_membership(user_id, restaurant_id)
            .await?
            .map(|m| m.is_owner)
            .unwrap_or(false);

        let catalog = self.catalog_repo.load_tree().await?;
        let entitlements = self.entitlement_repo.list_for_restaurant(restaurant_id).await?;
        let role_rows = self.rbac_repo.role_permission_rows(user_id, restaurant_id).await?;
        let override_rows = self.rbac_repo.override_rows(user_id, restaurant_id).await?;

        Ok(PermissionInputs {
            restaurant_id,
            principal: Principal { user_id, is_superadmin: user.is_superadmin, is_owner },
            catalog,
            entitlements: EntitlementMap::from_pairs(
                entitlements.into_iter().map(|e| (e.entity_type, e.entity_id, e.status)),
            ),
            role_grants: RoleGrants::from_rows(role_rows),
            overrides: UserOverrides::from_rows(override_rows),
        })
    }

    pub async fn check(
        &self,
        user: &User,
        restaurant_id: Uuid,
        feature_key: &str,
        action_key: &str,
    ) -> Result<PermissionDecision, AppError> {
        let snapshot = self.snapshot(user, restaurant_id).await?;
        snapshot.check(feature_key, action_key)
    }

    /// Como `check`, mas converte a negação em erro (402 bloqueado, 403 negado).
    pub async fn require(
        &self,
        user: &User,
        restaurant_id: Uuid,
        feature_key: &str,
        action_key: &str,
    ) -> Result<PermissionDecision, AppError> {
        let decision = self.check(user, restaurant_id, feature_key, action_key).await?;
        if decision.allowed {
            return Ok(decision);
        }

        tracing::info!(
            user_id = %user.id,
            %restaurant_id,
            feature = feature_key,
            action = action_key,
            reason = ?decision.reason,
            "Permissão negada"
        );

        if decision.locked {
            Err(AppError::FeatureLocked(feature_key.to_string()))
        } else {
            Err(AppError::PermissionDenied {
                feature: feature_key.to_string(),
                action: action_key.to_string(),
            })
        }
    }

    /// Incrementa a versão dentro da transação do chamador.
    /// Depois do commit, chame `invalidate` para liberar o cache.
    pub async fn bump_perm_version<'e, E>(&self, executor: E, restaurant_id: Uuid) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.restaurant_repo
            .bump_perm_version(executor, restaurant_id)
            .await?
            .ok_or(AppError::RestaurantNotFound)
    }

    pub async fn invalidate(&self, restaurant_id: Uuid) {
        self.cache.invalidate_restaurant(restaurant_id).await;
    }
}
