// src/db/stock_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::stock::{StockItem, StockItemPayload, StockMovement, StockMovementReason, StockMovementType},
};

#[derive(Clone, Default)]
pub struct StockRepository;

fn map_item_conflict(e: sqlx::Error, name: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::UniqueConstraintViolation(format!(
                "Já existe um item de estoque com o nome '{}'.",
                name
            ));
        }
    }
    e.into()
}

// Movimentação com o nome do item (mesmo formato do histórico)
const MOVEMENT_COLUMNS: &str = r#"
    m.id, m.restaurant_id, m.item_id, i.name AS item_name, m.movement_type, m.reason,
    m.quantity, m.unit_cost, m.stock_after, m.notes, m.created_by, m.created_at
"#;

impl StockRepository {
    pub fn new() -> Self {
        Self
    }

    // ---
    // Itens
    // ---

    pub async fn list_items<'e, E>(&self, executor: E, restaurant_id: Uuid) -> Result<Vec<StockItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, StockItem>(
            "SELECT * FROM stock_items WHERE restaurant_id = $1 ORDER BY name ASC",
        )
        .bind(restaurant_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn find_item<'e, E>(&self, executor: E, restaurant_id: Uuid, id: Uuid) -> Result<Option<StockItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, StockItem>("SELECT * FROM stock_items WHERE id = $1 AND restaurant_id = $2")
            .bind(id)
            .bind(restaurant_id)
            .fetch_optional(executor)
            .await?;
        Ok(item)
    }

    /// Trava a linha até o fim da transação: duas saídas simultâneas não
    /// podem ler o mesmo saldo.
    pub async fn lock_item<'e, E>(&self, executor: E, restaurant_id: Uuid, id: Uuid) -> Result<Option<StockItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, StockItem>(
            "SELECT * FROM stock_items WHERE id = $1 AND restaurant_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(restaurant_id)
        .fetch_optional(executor)
        .await?;
        Ok(item)
    }

    pub async fn create_item<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        payload: &StockItemPayload,
    ) -> Result<StockItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let name = payload.name.trim();
        sqlx::query_as::<_, StockItem>(
            r#"
            INSERT INTO stock_items (restaurant_id, kind, name, unit_of_measure, min_stock_level)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(restaurant_id)
        .bind(payload.kind)
        .bind(name)
        .bind(payload.unit_of_measure.trim())
        .bind(payload.min_stock_level)
        .fetch_one(executor)
        .await
        .map_err(|e| map_item_conflict(e, name))
    }

    pub async fn update_item<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        id: Uuid,
        payload: &StockItemPayload,
    ) -> Result<Option<StockItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let name = payload.name.trim();
        sqlx::query_as::<_, StockItem>(
            r#"
            UPDATE stock_items
            SET kind = $3, name = $4, unit_of_measure = $5, min_stock_level = $6, updated_at = now()
            WHERE id = $1 AND restaurant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(restaurant_id)
        .bind(payload.kind)
        .bind(name)
        .bind(payload.unit_of_measure.trim())
        .bind(payload.min_stock_level)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_item_conflict(e, name))
    }

    pub async fn delete_item<'e, E>(&self, executor: E, restaurant_id: Uuid, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM stock_items WHERE id = $1 AND restaurant_id = $2")
            .bind(id)
            .bind(restaurant_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn update_levels<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        current_stock: Decimal,
        average_cost: Decimal,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE stock_items SET current_stock = $2, average_cost = $3, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(current_stock)
        .bind(average_cost)
        .execute(executor)
        .await?;
        Ok(())
    }

    // ---
    // Movimentações (livro-razão)
    // ---

    #[allow(clippy::too_many_arguments)]
    pub async fn record_movement<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        item_id: Uuid,
        movement_type: StockMovementType,
        reason: StockMovementReason,
        quantity: Decimal,
        unit_cost: Option<Decimal>,
        stock_after: Decimal,
        notes: Option<&str>,
        created_by: Uuid,
    ) -> Result<StockMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            WITH m AS (
                INSERT INTO stock_movements
                    (restaurant_id, item_id, movement_type, reason, quantity, unit_cost, stock_after, notes, created_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING *
            )
            SELECT {MOVEMENT_COLUMNS}
            FROM m JOIN stock_items i ON i.id = m.item_id
            "#
        );
        let movement = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(restaurant_id)
            .bind(item_id)
            .bind(movement_type)
            .bind(reason)
            .bind(quantity)
            .bind(unit_cost)
            .bind(stock_after)
            .bind(notes)
            .bind(created_by)
            .fetch_one(executor)
            .await?;
        Ok(movement)
    }

    pub async fn list_movements<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        item_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<StockMovement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM stock_movements m JOIN stock_items i ON i.id = m.item_id
            WHERE m.restaurant_id = $1 AND ($2::uuid IS NULL OR m.item_id = $2)
            ORDER BY m.created_at DESC
            LIMIT $3
            "#
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(restaurant_id)
            .bind(item_id)
            .bind(limit)
            .fetch_all(executor)
            .await?;
        Ok(movements)
    }

    /// (total de itens, itens no nível mínimo ou abaixo)
    pub async fn count_items<'e, E>(&self, executor: E, restaurant_id: Uuid) -> Result<(i64, i64), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let counts = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE min_stock_level IS NOT NULL AND current_stock <= min_stock_level)
            FROM stock_items
            WHERE restaurant_id = $1
            "#,
        )
        .bind(restaurant_id)
        .fetch_one(executor)
        .await?;
        Ok(counts)
    }
}
