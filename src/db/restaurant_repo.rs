// src/db/restaurant_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::restaurant::{MemberListing, Restaurant, RestaurantMember},
};

#[derive(Clone)]
pub struct RestaurantRepository {
    pool: PgPool,
}

impl RestaurantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Cria um novo restaurante (tenant).
    pub async fn create_restaurant<'e, E>(
        &self,
        executor: E,
        name: &str,
        description: Option<&str>,
    ) -> Result<Restaurant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let restaurant = sqlx::query_as::<_, Restaurant>(
            r#"
            INSERT INTO restaurants (name, description)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(description)
        .fetch_one(executor)
        .await?;

        Ok(restaurant)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Restaurant>, AppError> {
        let restaurant = sqlx::query_as::<_, Restaurant>("SELECT * FROM restaurants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(restaurant)
    }

    /// Liga um usuário ao restaurante. Se o vínculo já existe, mantém o atual.
    pub async fn add_member<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        user_id: Uuid,
        is_owner: bool,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO restaurant_members (user_id, restaurant_id, is_owner)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, restaurant_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(restaurant_id)
        .bind(is_owner)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// O vínculo do usuário com o restaurante, se existir.
    /// Esta é a verificação de autorização mais básica (antes de qualquer papel).
    pub async fn find_membership(
        &self,
        user_id: Uuid,
        restaurant_id: Uuid,
    ) -> Result<Option<RestaurantMember>, AppError> {
        let member = sqlx::query_as::<_, RestaurantMember>(
            r#"
            SELECT user_id, restaurant_id, is_owner, created_at
            FROM restaurant_members
            WHERE user_id = $1 AND restaurant_id = $2
            "#,
        )
        .bind(user_id)
        .bind(restaurant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    pub async fn find_restaurants_for_user(&self, user_id: Uuid) -> Result<Vec<Restaurant>, AppError> {
        let restaurants = sqlx::query_as::<_, Restaurant>(
            r#"
            SELECT r.*
            FROM restaurants r
            JOIN restaurant_members m ON m.restaurant_id = r.id
            WHERE m.user_id = $1
            ORDER BY r.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(restaurants)
    }

    pub async fn list_members(&self, restaurant_id: Uuid) -> Result<Vec<MemberListing>, AppError> {
        let members = sqlx::query_as::<_, MemberListing>(
            r#"
            SELECT m.user_id, u.email, m.is_owner, m.created_at
            FROM restaurant_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.restaurant_id = $1
            ORDER BY m.is_owner DESC, u.email ASC
            "#,
        )
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    // ---
    // Versão de permissões (invalidação de snapshots)
    // ---

    pub async fn perm_version(&self, restaurant_id: Uuid) -> Result<Option<i32>, AppError> {
        let version: Option<i32> =
            sqlx::query_scalar("SELECT perm_version FROM restaurants WHERE id = $1")
                .bind(restaurant_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(version)
    }

    pub async fn bump_perm_version<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
    ) -> Result<Option<i32>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let version: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE restaurants
            SET perm_version = perm_version + 1, updated_at = now()
            WHERE id = $1
            RETURNING perm_version
            "#,
        )
        .bind(restaurant_id)
        .fetch_optional(executor)
        .await?;

        Ok(version)
    }
}
