// src/db/customer_repo.rs

use rust_decimal::Decimal;
use sqlx::{types::Json, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::customers::{Customer, CustomerPayload, CustomerSegment, SegmentPayload},
};

#[derive(Clone, Default)]
pub struct CustomerRepository;

fn map_conflict(e: sqlx::Error, message: String) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::UniqueConstraintViolation(message);
        }
    }
    e.into()
}

impl CustomerRepository {
    pub fn new() -> Self {
        Self
    }

    // ---
    // Clientes
    // ---

    pub async fn list_customers<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        segment_id: Option<Uuid>,
    ) -> Result<Vec<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT * FROM customers
            WHERE restaurant_id = $1 AND ($2::uuid IS NULL OR segment_id = $2)
            ORDER BY name ASC
            "#,
        )
        .bind(restaurant_id)
        .bind(segment_id)
        .fetch_all(executor)
        .await?;
        Ok(customers)
    }

    pub async fn find_customer<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1 AND restaurant_id = $2")
            .bind(id)
            .bind(restaurant_id)
            .fetch_optional(executor)
            .await?;
        Ok(customer)
    }

    pub async fn create_customer<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        payload: &CustomerPayload,
    ) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let email = payload.email.as_deref().map(|e| e.trim().to_lowercase());
        sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (restaurant_id, name, email, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(restaurant_id)
        .bind(payload.name.trim())
        .bind(email.as_deref())
        .bind(payload.phone.as_deref())
        .fetch_one(executor)
        .await
        .map_err(|e| map_conflict(e, "Já existe um cliente com este e-mail.".into()))
    }

    pub async fn record_visit<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        id: Uuid,
        amount: Decimal,
    ) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers
            SET total_spent = total_spent + $3, visit_count = visit_count + 1,
                last_visit_at = now(), updated_at = now()
            WHERE id = $1 AND restaurant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(restaurant_id)
        .bind(amount)
        .fetch_optional(executor)
        .await?;
        Ok(customer)
    }

    /// Grava os segmentos calculados em lote; devolve quantos mudaram.
    pub async fn assign_segments<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        customer_ids: &[Uuid],
        segment_ids: &[Option<Uuid>],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE customers c
            SET segment_id = a.segment_id, updated_at = now()
            FROM UNNEST($2::uuid[], $3::uuid[]) AS a(customer_id, segment_id)
            WHERE c.id = a.customer_id
              AND c.restaurant_id = $1
              AND c.segment_id IS DISTINCT FROM a.segment_id
            "#,
        )
        .bind(restaurant_id)
        .bind(customer_ids)
        .bind(segment_ids)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    // ---
    // Segmentos
    // ---

    pub async fn list_segments<'e, E>(&self, executor: E, restaurant_id: Uuid) -> Result<Vec<CustomerSegment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let segments = sqlx::query_as::<_, CustomerSegment>(
            "SELECT * FROM customer_segments WHERE restaurant_id = $1 ORDER BY priority DESC, name ASC",
        )
        .bind(restaurant_id)
        .fetch_all(executor)
        .await?;
        Ok(segments)
    }

    pub async fn find_segment<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<CustomerSegment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let segment = sqlx::query_as::<_, CustomerSegment>(
            "SELECT * FROM customer_segments WHERE id = $1 AND restaurant_id = $2",
        )
        .bind(id)
        .bind(restaurant_id)
        .fetch_optional(executor)
        .await?;
        Ok(segment)
    }

    pub async fn create_segment<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        payload: &SegmentPayload,
    ) -> Result<CustomerSegment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let name = payload.name.trim();
        sqlx::query_as::<_, CustomerSegment>(
            r#"
            INSERT INTO customer_segments (restaurant_id, name, description, rules, priority)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(restaurant_id)
        .bind(name)
        .bind(payload.description.as_deref())
        .bind(Json(&payload.rules))
        .bind(payload.priority)
        .fetch_one(executor)
        .await
        .map_err(|e| map_conflict(e, format!("Já existe um segmento com o nome '{}'.", name)))
    }

    pub async fn update_segment<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        id: Uuid,
        payload: &SegmentPayload,
    ) -> Result<Option<CustomerSegment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let name = payload.name.trim();
        sqlx::query_as::<_, CustomerSegment>(
            r#"
            UPDATE customer_segments
            SET name = $3, description = $4, rules = $5, priority = $6, updated_at = now()
            WHERE id = $1 AND restaurant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(restaurant_id)
        .bind(name)
        .bind(payload.description.as_deref())
        .bind(Json(&payload.rules))
        .bind(payload.priority)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_conflict(e, format!("Já existe um segmento com o nome '{}'.", name)))
    }

    pub async fn delete_segment<'e, E>(&self, executor: E, restaurant_id: Uuid, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM customer_segments WHERE id = $1 AND restaurant_id = $2")
            .bind(id)
            .bind(restaurant_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
