// src/db/menu_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::menu::{Addon, Category},
};

// Todas as funções recebem o executor da transação com RLS
// (ver `common::db_utils::begin_scoped_tx`), nunca a pool direto.
#[derive(Clone, Default)]
pub struct MenuRepository;

fn map_name_conflict(e: sqlx::Error, what: &str, name: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::UniqueConstraintViolation(format!(
                "Já existe {} com o nome '{}'.",
                what, name
            ));
        }
    }
    e.into()
}

impl MenuRepository {
    pub fn new() -> Self {
        Self
    }

    // ---
    // Categorias
    // ---

    pub async fn list_categories<'e, E>(&self, executor: E, restaurant_id: Uuid) -> Result<Vec<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE restaurant_id = $1 ORDER BY sort_order ASC, name ASC",
        )
        .bind(restaurant_id)
        .fetch_all(executor)
        .await?;
        Ok(categories)
    }

    pub async fn find_category<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let category = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE id = $1 AND restaurant_id = $2",
        )
        .bind(id)
        .bind(restaurant_id)
        .fetch_optional(executor)
        .await?;
        Ok(category)
    }

    pub async fn create_category<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        name: &str,
        sort_order: i32,
    ) -> Result<Category, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (restaurant_id, name, sort_order)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(restaurant_id)
        .bind(name)
        .bind(sort_order)
        .fetch_one(executor)
        .await
        .map_err(|e| map_name_conflict(e, "uma categoria", name))
    }

    pub async fn update_category<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        id: Uuid,
        name: &str,
        sort_order: i32,
    ) -> Result<Option<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = $3, sort_order = $4, updated_at = now()
            WHERE id = $1 AND restaurant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(restaurant_id)
        .bind(name)
        .bind(sort_order)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_name_conflict(e, "uma categoria", name))
    }

    pub async fn set_category_active<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        id: Uuid,
        is_active: bool,
    ) -> Result<Option<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let category = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories SET is_active = $3, updated_at = now()
            WHERE id = $1 AND restaurant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(restaurant_id)
        .bind(is_active)
        .fetch_optional(executor)
        .await?;
        Ok(category)
    }

    pub async fn delete_category<'e, E>(&self, executor: E, restaurant_id: Uuid, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND restaurant_id = $2")
            .bind(id)
            .bind(restaurant_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // ---
    // Adicionais
    // ---

    pub async fn list_addons<'e, E>(&self, executor: E, restaurant_id: Uuid) -> Result<Vec<Addon>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let addons = sqlx::query_as::<_, Addon>(
            "SELECT * FROM addons WHERE restaurant_id = $1 ORDER BY name ASC",
        )
        .bind(restaurant_id)
        .fetch_all(executor)
        .await?;
        Ok(addons)
    }

    pub async fn find_addon<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Addon>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let addon = sqlx::query_as::<_, Addon>("SELECT * FROM addons WHERE id = $1 AND restaurant_id = $2")
            .bind(id)
            .bind(restaurant_id)
            .fetch_optional(executor)
            .await?;
        Ok(addon)
    }

    pub async fn create_addon<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        name: &str,
        price: Decimal,
    ) -> Result<Addon, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Addon>(
            r#"
            INSERT INTO addons (restaurant_id, name, price)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(restaurant_id)
        .bind(name)
        .bind(price)
        .fetch_one(executor)
        .await
        .map_err(|e| map_name_conflict(e, "um adicional", name))
    }

    pub async fn update_addon<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        id: Uuid,
        name: &str,
        price: Decimal,
    ) -> Result<Option<Addon>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Addon>(
            r#"
            UPDATE addons
            SET name = $3, price = $4, updated_at = now()
            WHERE id = $1 AND restaurant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(restaurant_id)
        .bind(name)
        .bind(price)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_name_conflict(e, "um adicional", name))
    }

    pub async fn set_addon_active<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        id: Uuid,
        is_active: bool,
    ) -> Result<Option<Addon>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let addon = sqlx::query_as::<_, Addon>(
            r#"
            UPDATE addons SET is_active = $3, updated_at = now()
            WHERE id = $1 AND restaurant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(restaurant_id)
        .bind(is_active)
        .fetch_optional(executor)
        .await?;
        Ok(addon)
    }

    pub async fn delete_addon<'e, E>(&self, executor: E, restaurant_id: Uuid, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM addons WHERE id = $1 AND restaurant_id = $2")
            .bind(id)
            .bind(restaurant_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
