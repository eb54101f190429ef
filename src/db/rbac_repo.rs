// src/db/rbac_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::rbac::{
        PermissionGrant, PermissionRow, Role, RolePermissionView, UserOverrideView,
        UserRoleAssignment,
    },
};

#[derive(Clone)]
pub struct RbacRepository {
    pool: PgPool,
}

// Converte violações de chave única/estrangeira em erros de domínio
fn map_role_write_error(e: sqlx::Error, key: &str) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return AppError::UniqueConstraintViolation(format!(
                "Já existe um cargo com a chave '{}'.",
                key
            ));
        }
    }
    e.into()
}

fn map_grant_write_error(e: sqlx::Error) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_foreign_key_violation() {
            return AppError::BadRequest(
                "Funcionalidade ou ação inexistente na lista de permissões.".into(),
            );
        }
        if db_err.is_unique_violation() {
            return AppError::BadRequest(
                "A lista de permissões repete o mesmo par funcionalidade/ação.".into(),
            );
        }
    }
    e.into()
}

impl RbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  CARGOS
    // =========================================================================

    pub async fn create_role<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        key: &str,
        name: &str,
    ) -> Result<Role, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (restaurant_id, key, name, is_system)
            VALUES ($1, $2, $3, FALSE)
            RETURNING *
            "#,
        )
        .bind(restaurant_id)
        .bind(key)
        .bind(name)
        .fetch_one(executor)
        .await
        .map_err(|e| map_role_write_error(e, key))
    }

    pub async fn find_role(&self, role_id: Uuid) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    /// Cargos do restaurante + cargos de sistema.
    pub async fn list_roles(&self, restaurant_id: Uuid) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT * FROM roles
            WHERE restaurant_id = $1 OR restaurant_id IS NULL
            ORDER BY is_system DESC, name ASC
            "#,
        )
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    pub async fn rename_role<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        name: &str,
    ) -> Result<Role, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let role = sqlx::query_as::<_, Role>(
            "UPDATE roles SET name = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(role_id)
        .bind(name)
        .fetch_optional(executor)
        .await?;

        role.ok_or(AppError::RoleNotFound)
    }

    pub async fn delete_role<'e, E>(&self, executor: E, role_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    //  PERMISSÕES DOS CARGOS
    // =========================================================================

    pub async fn get_role_permissions(&self, role_id: Uuid) -> Result<Vec<RolePermissionView>, AppError> {
        let permissions = sqlx::query_as::<_, RolePermissionView>(
            r#"
            SELECT rp.role_id, rp.feature_id, f.key AS feature_key, f.name AS feature_name,
                   rp.action_id, a.key AS action_key, rp.allowed
            FROM role_permissions rp
            JOIN features f ON f.id = rp.feature_id
            JOIN actions a ON a.id = rp.action_id
            WHERE rp.role_id = $1
            ORDER BY f.key, rp.action_id
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(permissions)
    }

    pub async fn clear_role_permissions<'e, E>(&self, executor: E, role_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    // Inserção em massa usando UNNEST
    pub async fn insert_role_permissions<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        grants: &[PermissionGrant],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (feature_ids, action_ids, allowed) = split_grants(grants);

        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, feature_id, action_id, allowed)
            SELECT $1, g.feature_id, g.action_id, g.allowed
            FROM UNNEST($2::uuid[], $3::smallint[], $4::boolean[]) AS g(feature_id, action_id, allowed)
            "#,
        )
        .bind(role_id)
        .bind(&feature_ids)
        .bind(&action_ids)
        .bind(&allowed)
        .execute(executor)
        .await
        .map_err(map_grant_write_error)?;

        Ok(())
    }

    // =========================================================================
    //  CARGOS DOS USUÁRIOS
    // =========================================================================

    pub async fn assign_user_role<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        restaurant_id: Uuid,
        role_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, restaurant_id, role_id)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(restaurant_id)
        .bind(role_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_user_role<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        restaurant_id: Uuid,
        role_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "DELETE FROM user_roles WHERE user_id = $1 AND restaurant_id = $2 AND role_id = $3",
        )
        .bind(user_id)
        .bind(restaurant_id)
        .bind(role_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn list_user_roles(
        &self,
        user_id: Uuid,
        restaurant_id: Uuid,
    ) -> Result<Vec<UserRoleAssignment>, AppError> {
        let roles = sqlx::query_as::<_, UserRoleAssignment>(
            r#"
            SELECT ur.user_id, ur.restaurant_id, ur.role_id,
                   r.key AS role_key, r.name AS role_name, ur.created_at
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1 AND ur.restaurant_id = $2
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    // =========================================================================
    //  OVERRIDES POR USUÁRIO
    // =========================================================================

    pub async fn get_user_overrides(
        &self,
        user_id: Uuid,
        restaurant_id: Uuid,
    ) -> Result<Vec<UserOverrideView>, AppError> {
        let overrides = sqlx::query_as::<_, UserOverrideView>(
            r#"
            SELECT o.user_id, o.restaurant_id, o.feature_id, f.key AS feature_key,
                   f.name AS feature_name, o.action_id, a.key AS action_key, o.allowed
            FROM user_permission_overrides o
            JOIN features f ON f.id = o.feature_id
            JOIN actions a ON a.id = o.action_id
            WHERE o.user_id = $1 AND o.restaurant_id = $2
            ORDER BY f.key, o.action_id
            "#,
        )
        .bind(user_id)
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(overrides)
    }

    pub async fn clear_user_overrides<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        restaurant_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM user_permission_overrides WHERE user_id = $1 AND restaurant_id = $2")
            .bind(user_id)
            .bind(restaurant_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn insert_user_overrides<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        restaurant_id: Uuid,
        grants: &[PermissionGrant],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (feature_ids, action_ids, allowed) = split_grants(grants);

        sqlx::query(
            r#"
            INSERT INTO user_permission_overrides (user_id, restaurant_id, feature_id, action_id, allowed)
            SELECT $1, $2, g.feature_id, g.action_id, g.allowed
            FROM UNNEST($3::uuid[], $4::smallint[], $5::boolean[]) AS g(feature_id, action_id, allowed)
            "#,
        )
        .bind(user_id)
        .bind(restaurant_id)
        .bind(&feature_ids)
        .bind(&action_ids)
        .bind(&allowed)
        .execute(executor)
        .await
        .map_err(map_grant_write_error)?;

        Ok(())
    }

    pub async fn delete_user_override<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        restaurant_id: Uuid,
        feature_id: Uuid,
        action_id: i16,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            DELETE FROM user_permission_overrides
            WHERE user_id = $1 AND restaurant_id = $2 AND feature_id = $3 AND action_id = $4
            "#,
        )
        .bind(user_id)
        .bind(restaurant_id)
        .bind(feature_id)
        .bind(action_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    //  ENTRADAS DO RESOLVEDOR
    // =========================================================================

    /// Todas as linhas de permissão dos cargos do usuário no restaurante.
    /// A união (OR) entre cargos é feita no resolvedor.
    pub async fn role_permission_rows(
        &self,
        user_id: Uuid,
        restaurant_id: Uuid,
    ) -> Result<Vec<PermissionRow>, AppError> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT rp.feature_id, rp.action_id, rp.allowed
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            JOIN role_permissions rp ON rp.role_id = r.id
            WHERE ur.user_id = $1
              AND ur.restaurant_id = $2
              AND (r.restaurant_id = $2 OR r.restaurant_id IS NULL)
            "#,
        )
        .bind(user_id)
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn override_rows(
        &self,
        user_id: Uuid,
        restaurant_id: Uuid,
    ) -> Result<Vec<PermissionRow>, AppError> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT feature_id, action_id, allowed
            FROM user_permission_overrides
            WHERE user_id = $1 AND restaurant_id = $2
            "#,
        )
        .bind(user_id)
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

fn split_grants(grants: &[PermissionGrant]) -> (Vec<Uuid>, Vec<i16>, Vec<bool>) {
    let mut feature_ids = Vec::with_capacity(grants.len());
    let mut action_ids = Vec::with_capacity(grants.len());
    let mut allowed = Vec::with_capacity(grants.len());
    for grant in grants {
        feature_ids.push(grant.feature_id);
        action_ids.push(grant.action_id);
        allowed.push(grant.allowed);
    }
    (feature_ids, action_ids, allowed)
}
