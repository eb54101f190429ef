// src/services/iam_service.rs

use std::collections::HashSet;

use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        AuditRepository, CatalogRepository, EntitlementRepository, RbacRepository,
        RestaurantRepository, UserRepository,
    },
    models::{
        catalog::{Action, FeatureListing},
        entitlement::{
            BulkEntitlementsResult, Entitlement, EntitlementInput, EntityType, UpsertOutcome,
        },
        rbac::{PermissionGrant, Role, RolePermissionView, UserOverrideView, UserRoleAssignment},
    },
    services::permission_service::PermissionService,
};

// Administração de cargos, permissões, overrides e entitlements.
// Toda escrita é auditada e incrementa a perm_version do restaurante.
#[derive(Clone)]
pub struct IamService {
    pool: PgPool,
    user_repo: UserRepository,
    restaurant_repo: RestaurantRepository,
    catalog_repo: CatalogRepository,
    entitlement_repo: EntitlementRepository,
    rbac_repo: RbacRepository,
    audit_repo: AuditRepository,
    permissions: PermissionService,
}

impl IamService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        user_repo: UserRepository,
        restaurant_repo: RestaurantRepository,
        catalog_repo: CatalogRepository,
        entitlement_repo: EntitlementRepository,
        rbac_repo: RbacRepository,
        audit_repo: AuditRepository,
        permissions: PermissionService,
    ) -> Self {
        Self {
            pool,
            user_repo,
            restaurant_repo,
            catalog_repo,
            entitlement_repo,
            rbac_repo,
            audit_repo,
            permissions,
        }
    }

    // Fecha a escrita: nova perm_version, commit e limpeza do cache
    async fn finish(&self, mut tx: Transaction<'static, Postgres>, restaurant_id: Uuid) -> Result<(), AppError> {
        let version = self.permissions.bump_perm_version(&mut *tx, restaurant_id).await?;
        tx.commit().await?;
        self.permissions.invalidate(restaurant_id).await;
        tracing::debug!(%restaurant_id, version, "perm_version incrementada");
        Ok(())
    }

    async fn visible_role(&self, restaurant_id: Uuid, role_id: Uuid) -> Result<Role, AppError> {
        self.rbac_repo
            .find_role(role_id)
            .await?
            .filter(|role| role.is_visible_to(restaurant_id))
            .ok_or(AppError::RoleNotFound)
    }

    async fn editable_role(&self, restaurant_id: Uuid, role_id: Uuid) -> Result<Role, AppError> {
        let role = self.visible_role(restaurant_id, role_id).await?;
        if !role.is_editable_by(restaurant_id) {
            return Err(AppError::Forbidden(
                "Cargos de sistema não podem ser alterados.".into(),
            ));
        }
        Ok(role)
    }

    async fn ensure_member(&self, user_id: Uuid, restaurant_id: Uuid) -> Result<(), AppError> {
        self.restaurant_repo
            .find_membership(user_id, restaurant_id)
            .await?
            .map(|_| ())
            .ok_or(AppError::UserNotFound)
    }

    // =========================================================================
    //  CATÁLOGO
    // =========================================================================

    pub async fn list_features(&self) -> Result<Vec<FeatureListing>, AppError> {
        self.catalog_repo.list_features().await
    }

    pub async fn list_actions(&self) -> Result<Vec<Action>, AppError> {
        self.catalog_repo.list_actions().await
    }

    // =========================================================================
    //  CARGOS
    // =========================================================================

    pub async fn list_roles(&self, restaurant_id: Uuid) -> Result<Vec<Role>, AppError> {
        self.rbac_repo.list_roles(restaurant_id).await
    }

    pub async fn create_role(
        &self,
        actor_id: Uuid,
        restaurant_id: Uuid,
        key: &str,
        name: &str,
    ) -> Result<Role, AppError> {
        let mut tx = self.pool.begin().await?;

        let role = self.rbac_repo.create_role(&mut *tx, restaurant_id, key, name).await?;
        self.audit_repo
            .log(
                &mut *tx,
                actor_id,
                Some(restaurant_id),
                "role.create",
                "role",
                json!({ "roleId": role.id, "key": key, "name": name }),
            )
            .await?;

        self.finish(tx, restaurant_id).await?;
        tracing::info!(%restaurant_id, role_id = %role.id, "Cargo criado");
        Ok(role)
    }

    pub async fn update_role(
        &self,
        actor_id: Uuid,
        restaurant_id: Uuid,
        role_id: Uuid,
        name: &str,
    ) -> Result<Role, AppError> {
        let before = self.editable_role(restaurant_id, role_id).await?;
        let mut tx = self.pool.begin().await?;

        let role = self.rbac_repo.rename_role(&mut *tx, role_id, name).await?;
        self.audit_repo
            .log(
                &mut *tx,
                actor_id,
                Some(restaurant_id),
                "role.update",
                "role",
                json!({ "roleId": role_id, "from": before.name, "to": name }),
            )
            .await?;

        self.finish(tx, restaurant_id).await?;
        Ok(role)
    }

    pub async fn delete_role(&self, actor_id: Uuid, restaurant_id: Uuid, role_id: Uuid) -> Result<(), AppError> {
        let role = self.editable_role(restaurant_id, role_id).await?;
        let mut tx = self.pool.begin().await?;

        if self.rbac_repo.delete_role(&mut *tx, role_id).await? == 0 {
            return Err(AppError::RoleNotFound);
        }
        self.audit_repo
            .log(
                &mut *tx,
                actor_id,
                Some(restaurant_id),
                "role.delete",
                "role",
                json!({ "roleId": role_id, "key": role.key }),
            )
            .await?;

        self.finish(tx, restaurant_id).await?;
        tracing::info!(%restaurant_id, %role_id, "Cargo removido");
        Ok(())
    }

    // =========================================================================
    //  PERMISSÕES DOS CARGOS
    // =========================================================================

    pub async fn get_role_permissions(
        &self,
        restaurant_id: Uuid,
        role_id: Uuid,
    ) -> Result<Vec<RolePermissionView>, AppError> {
        self.visible_role(restaurant_id, role_id).await?;
        self.rbac_repo.get_role_permissions(role_id).await
    }

    /// Substitui todas as permissões do cargo, de forma atômica.
    pub async fn set_role_permissions(
        &self,
        actor_id: Uuid,
        restaurant_id: Uuid,
        role_id: Uuid,
        grants: &[PermissionGrant],
    ) -> Result<Vec<RolePermissionView>, AppError> {
        self.editable_role(restaurant_id, role_id).await?;
        let mut tx = self.pool.begin().await?;

        self.rbac_repo.clear_role_permissions(&mut *tx, role_id).await?;
        if !grants.is_empty() {
            self.rbac_repo.insert_role_permissions(&mut *tx, role_id, grants).await?;
        }
        self.audit_repo
            .log(
                &mut *tx,
                actor_id,
                Some(restaurant_id),
                "role.permissions.set",
                "role",
                json!({ "roleId": role_id, "count": grants.len() }),
            )
            .await?;

        self.finish(tx, restaurant_id).await?;
        self.rbac_repo.get_role_permissions(role_id).await
    }

    // =========================================================================
    //  CARGOS DOS USUÁRIOS
    // =========================================================================

    pub async fn list_user_roles(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<UserRoleAssignment>, AppError> {
        self.rbac_repo.list_user_roles(user_id, restaurant_id).await
    }

    /// Atribui o cargo e, se preciso, torna o usuário membro do restaurante.
    pub async fn assign_user_role(
        &self,
        actor_id: Uuid,
        restaurant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<Vec<UserRoleAssignment>, AppError> {
        self.visible_role(restaurant_id, role_id).await?;
        let mut tx = self.pool.begin().await?;

        if !self.user_repo.exists(&mut *tx, user_id).await? {
            return Err(AppError::UserNotFound);
        }
        self.restaurant_repo.add_member(&mut *tx, restaurant_id, user_id, false).await?;
        let created = self
            .rbac_repo
            .assign_user_role(&mut *tx, user_id, restaurant_id, role_id)
            .await?;

        if created {
            self.audit_repo
                .log(
                    &mut *tx,
                    actor_id,
                    Some(restaurant_id),
                    "user.role.assign",
                    "user",
                    json!({ "userId": user_id, "roleId": role_id }),
                )
                .await?;
            self.finish(tx, restaurant_id).await?;
        } else {
            tx.commit().await?;
        }

        self.rbac_repo.list_user_roles(user_id, restaurant_id).await
    }

    pub async fn remove_user_role(
        &self,
        actor_id: Uuid,
        restaurant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let removed = self
            .rbac_repo
            .remove_user_role(&mut *tx, user_id, restaurant_id, role_id)
            .await?;
        if removed == 0 {
            return Err(AppError::ResourceNotFound("Atribuição de cargo"));
        }
        self.audit_repo
            .log(
                &mut *tx,
                actor_id,
                Some(restaurant_id),
                "user.role.remove",
                "user",
                json!({ "userId": user_id, "roleId": role_id }),
            )
            .await?;

        self.finish(tx, restaurant_id).await
    }

    // =========================================================================
    //  OVERRIDES
    // =========================================================================

    pub async fn get_user_overrides(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<UserOverrideView>, AppError> {
        self.rbac_repo.get_user_overrides(user_id, restaurant_id).await
    }

    /// Substitui todos os overrides do usuário no restaurante.
    pub async fn set_user_overrides(
        &self,
        actor_id: Uuid,
        restaurant_id: Uuid,
        user_id: Uuid,
        grants: &[PermissionGrant],
    ) -> Result<Vec<UserOverrideView>, AppError> {
        self.ensure_member(user_id, restaurant_id).await?;
        let mut tx = self.pool.begin().await?;

        self.rbac_repo.clear_user_overrides(&mut *tx, user_id, restaurant_id).await?;
        if !grants.is_empty() {
            self.rbac_repo
                .insert_user_overrides(&mut *tx, user_id, restaurant_id, grants)
                .await?;
        }
        self.audit_repo
            .log(
                &mut *tx,
                actor_id,
                Some(restaurant_id),
                "user.overrides.set",
                "user",
                json!({ "userId": user_id, "count": grants.len() }),
            )
            .await?;

        self.finish(tx, restaurant_id).await?;
        self.rbac_repo.get_user_overrides(user_id, restaurant_id).await
    }

    pub async fn delete_user_override(
        &self,
        actor_id: Uuid,
        restaurant_id: Uuid,
        user_id: Uuid,
        feature_id: Uuid,
        action_id: i16,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let removed = self
            .rbac_repo
            .delete_user_override(&mut *tx, user_id, restaurant_id, feature_id, action_id)
            .await?;
        if removed == 0 {
            return Err(AppError::ResourceNotFound("Override"));
        }
        self.audit_repo
            .log(
                &mut *tx,
                actor_id,
                Some(restaurant_id),
                "user.override.delete",
                "user",
                json!({ "userId": user_id, "featureId": feature_id, "actionId": action_id }),
            )
            .await?;

        self.finish(tx, restaurant_id).await
    }

    // =========================================================================
    //  ENTITLEMENTS
    // =========================================================================

    pub async fn list_entitlements(&self, restaurant_id: Uuid) -> Result<Vec<Entitlement>, AppError> {
        self.entitlement_repo.list_for_restaurant(restaurant_id).await
    }

    // Todos os nós citados precisam existir na tabela do seu tipo
    async fn ensure_entities_exist(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        inputs: &[EntitlementInput],
    ) -> Result<(), AppError> {
        for entity_type in [EntityType::Module, EntityType::Submodule, EntityType::Feature] {
            let wanted: Vec<Uuid> = inputs
                .iter()
                .filter(|i| i.entity_type == entity_type)
                .map(|i| i.entity_id)
                .collect();
            if wanted.is_empty() {
                continue;
            }

            let found: HashSet<Uuid> = self
                .catalog_repo
                .existing_entity_ids(&mut **tx, entity_type, &wanted)
                .await?
                .into_iter()
                .collect();

            if let Some(missing) = wanted.iter().find(|id| !found.contains(id)) {
                return Err(AppError::BadRequest(format!(
                    "O {} '{}' não existe no catálogo.",
                    entity_type.as_str(),
                    missing
                )));
            }
        }
        Ok(())
    }

    async fn ensure_restaurant(&self, restaurant_id: Uuid) -> Result<(), AppError> {
        self.restaurant_repo
            .find_by_id(restaurant_id)
            .await?
            .map(|_| ())
            .ok_or(AppError::RestaurantNotFound)
    }

    pub async fn set_entitlement(
        &self,
        actor_id: Uuid,
        restaurant_id: Uuid,
        input: &EntitlementInput,
    ) -> Result<UpsertOutcome, AppError> {
        self.ensure_restaurant(restaurant_id).await?;
        let mut tx = self.pool.begin().await?;
        self.ensure_entities_exist(&mut tx, std::slice::from_ref(input)).await?;

        let outcome = self.upsert_one(&mut tx, restaurant_id, input).await?;
        self.audit_repo
            .log(
                &mut *tx,
                actor_id,
                Some(restaurant_id),
                "entitlement.set",
                "entitlement",
                json!({
                    "entityType": input.entity_type,
                    "entityId": input.entity_id,
                    "status": input.status,
                    "source": input.source,
                    "outcome": outcome,
                }),
            )
            .await?;

        if outcome == UpsertOutcome::Unchanged {
            tx.commit().await?;
        } else {
            self.finish(tx, restaurant_id).await?;
        }
        Ok(outcome)
    }

    async fn upsert_one(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        restaurant_id: Uuid,
        input: &EntitlementInput,
    ) -> Result<UpsertOutcome, AppError> {
        let metadata = input.metadata.clone().unwrap_or_else(|| json!({}));
        self.entitlement_repo
            .upsert(
                &mut **tx,
                restaurant_id,
                input.entity_type,
                input.entity_id,
                input.status,
                &input.source,
                &metadata,
            )
            .await
    }

    /// Aplica vários entitlements numa transação só.
    pub async fn set_entitlements_bulk(
        &self,
        actor_id: Uuid,
        restaurant_id: Uuid,
        inputs: &[EntitlementInput],
    ) -> Result<BulkEntitlementsResult, AppError> {
        self.ensure_restaurant(restaurant_id).await?;
        let mut tx = self.pool.begin().await?;
        self.ensure_entities_exist(&mut tx, inputs).await?;

        let mut result = BulkEntitlementsResult { created_count: 0, updated_count: 0 };
        for input in inputs {
            match self.upsert_one(&mut tx, restaurant_id, input).await? {
                UpsertOutcome::Created => result.created_count += 1,
                UpsertOutcome::Updated => result.updated_count += 1,
                UpsertOutcome::Unchanged => {}
            }
        }

        self.audit_repo
            .log(
                &mut *tx,
                actor_id,
                Some(restaurant_id),
                "entitlement.bulk",
                "entitlement",
                json!({
                    "count": inputs.len(),
                    "created": result.created_count,
                    "updated": result.updated_count,
                }),
            )
            .await?;

        if result.created_count + result.updated_count > 0 {
            self.finish(tx, restaurant_id).await?;
        } else {
            tx.commit().await?;
        }

        tracing::info!(
            %restaurant_id,
            created = result.created_count,
            updated = result.updated_count,
            "Entitlements aplicados em lote"
        );
        Ok(result)
    }

    pub async fn remove_entitlement(
        &self,
        actor_id: Uuid,
        restaurant_id: Uuid,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let removed = self
            .entitlement_repo
            .remove(&mut *tx, restaurant_id, entity_type, entity_id)
            .await?;
        if removed == 0 {
            return Err(AppError::ResourceNotFound("Entitlement"));
        }
        self.audit_repo
            .log(
                &mut *tx,
                actor_id,
                Some(restaurant_id),
                "entitlement.remove",
                "entitlement",
                json!({ "entityType": entity_type, "entityId": entity_id }),
            )
            .await?;

        self.finish(tx, restaurant_id).await
    }
}
