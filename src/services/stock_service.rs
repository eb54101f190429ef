// src/services/stock_service.rs

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_scoped_tx, error::AppError},
    db::{AuditRepository, StockRepository},
    models::stock::{
        apply_movement, new_average_cost, StockDashboard, StockItem, StockItemPayload, StockMovement,
        StockMovementPayload, StockMovementType,
    },
};

const ITEM: &str = "Item de estoque";
const HISTORY_LIMIT: i64 = 200;
const DASHBOARD_RECENT: i64 = 10;

#[derive(Clone)]
pub struct StockService {
    pool: PgPool,
    repo: StockRepository,
    audit_repo: AuditRepository,
}

impl StockService {
    pub fn new(pool: PgPool, repo: StockRepository, audit_repo: AuditRepository) -> Self {
        Self { pool, repo, audit_repo }
    }

    pub async fn list_items(&self, restaurant_id: Uuid, user_id: Uuid) -> Result<Vec<StockItem>, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;
        let items = self.repo.list_items(&mut *tx, restaurant_id).await?;
        tx.commit().await?;
        Ok(items)
    }

    pub async fn get_item(&self, restaurant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<StockItem, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;
        let item = self
            .repo
            .find_item(&mut *tx, restaurant_id, id)
            .await?
            .ok_or(AppError::ResourceNotFound(ITEM))?;
        tx.commit().await?;
        Ok(item)
    }

    pub async fn create_item(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        payload: &StockItemPayload,
    ) -> Result<StockItem, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        let item = self.repo.create_item(&mut *tx, restaurant_id, payload).await?;
        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "stock.item.create",
                "stock_item",
                json!({ "id": item.id, "name": item.name, "kind": item.kind }),
            )
            .await?;

        tx.commit().await?;
        Ok(item)
    }

    pub async fn update_item(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        id: Uuid,
        payload: &StockItemPayload,
    ) -> Result<StockItem, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        let item = self
            .repo
            .update_item(&mut *tx, restaurant_id, id, payload)
            .await?
            .ok_or(AppError::ResourceNotFound(ITEM))?;
        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "stock.item.update",
                "stock_item",
                json!({ "id": id, "name": item.name, "minStockLevel": item.min_stock_level }),
            )
            .await?;

        tx.commit().await?;
        Ok(item)
    }

    pub async fn delete_item(&self, restaurant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        if self.repo.delete_item(&mut *tx, restaurant_id, id).await? == 0 {
            return Err(AppError::ResourceNotFound(ITEM));
        }
        self.audit_repo
            .log(&mut *tx, user_id, Some(restaurant_id), "stock.item.delete", "stock_item", json!({ "id": id }))
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Registra a movimentação e atualiza saldo e custo médio na mesma transação.
    pub async fn record_movement(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        payload: &StockMovementPayload,
    ) -> Result<StockMovement, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        let item = self
            .repo
            .lock_item(&mut *tx, restaurant_id, payload.item_id)
            .await?
            .ok_or(AppError::ResourceNotFound(ITEM))?;

        let stock_after = apply_movement(item.current_stock, payload.movement_type, payload.quantity)
            .ok_or_else(|| AppError::BadRequest("Estoque insuficiente para esta saída.".into()))?;

        let average_cost = match (payload.movement_type, payload.unit_cost) {
            (StockMovementType::Entry, Some(cost)) => {
                new_average_cost(item.current_stock, item.average_cost, payload.quantity, cost)
            }
            _ => item.average_cost,
        };

        self.repo.update_levels(&mut *tx, item.id, stock_after, average_cost).await?;
        let movement = self
            .repo
            .record_movement(
                &mut *tx,
                restaurant_id,
                item.id,
                payload.movement_type,
                payload.reason,
                payload.quantity,
                payload.unit_cost,
                stock_after,
                payload.notes.as_deref(),
                user_id,
            )
            .await?;

        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "stock.movement.create",
                "stock_movement",
                json!({
                    "id": movement.id,
                    "itemId": item.id,
                    "type": payload.movement_type,
                    "reason": payload.reason,
                    "quantity": payload.quantity,
                    "stockAfter": stock_after,
                }),
            )
            .await?;

        tx.commit().await?;
        tracing::debug!(item_id = %item.id, %stock_after, "Movimentação de estoque registrada");
        Ok(movement)
    }

    pub async fn item_history(&self, restaurant_id: Uuid, user_id: Uuid, item_id: Uuid) -> Result<Vec<StockMovement>, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;
        if self.repo.find_item(&mut *tx, restaurant_id, item_id).await?.is_none() {
            return Err(AppError::ResourceNotFound(ITEM));
        }
        let movements = self
            .repo
            .list_movements(&mut *tx, restaurant_id, Some(item_id), HISTORY_LIMIT)
            .await?;
        tx.commit().await?;
        Ok(movements)
    }

    pub async fn dashboard(&self, restaurant_id: Uuid, user_id: Uuid) -> Result<StockDashboard, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;
        let (total_items, low_stock_items) = self.repo.count_items(&mut *tx, restaurant_id).await?;
        let recent_movements = self
            .repo
            .list_movements(&mut *tx, restaurant_id, None, DASHBOARD_RECENT)
            .await?;
        tx.commit().await?;

        Ok(StockDashboard { total_items, low_stock_items, recent_movements })
    }
}
