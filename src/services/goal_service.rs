// src/services/goal_service.rs

use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_scoped_tx, error::AppError},
    db::{AuditRepository, GoalRepository},
    models::goals::{Goal, GoalFilter, GoalPage, GoalPayload, GoalStatus, Pagination},
};

const GOAL: &str = "Meta";

#[derive(Clone)]
pub struct GoalService {
    pool: PgPool,
    repo: GoalRepository,
    audit_repo: AuditRepository,
}

impl GoalService {
    pub fn new(pool: PgPool, repo: GoalRepository, audit_repo: AuditRepository) -> Self {
        Self { pool, repo, audit_repo }
    }

    pub async fn list(&self, restaurant_id: Uuid, user_id: Uuid, filter: &GoalFilter) -> Result<GoalPage, AppError> {
        let (page, limit, offset) = filter.page_window();

        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;
        let total = self.repo.count(&mut *tx, restaurant_id, filter).await?;
        let goals = self.repo.list(&mut *tx, restaurant_id, filter, limit, offset).await?;
        tx.commit().await?;

        Ok(GoalPage { goals, pagination: Pagination::new(total, page, limit) })
    }

    pub async fn get(&self, restaurant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<Goal, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;
        let goal = self
            .repo
            .find(&mut *tx, restaurant_id, id)
            .await?
            .ok_or(AppError::ResourceNotFound(GOAL))?;
        tx.commit().await?;
        Ok(goal)
    }

    pub async fn create(&self, restaurant_id: Uuid, user_id: Uuid, payload: &GoalPayload) -> Result<Goal, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        let goal = self.repo.create(&mut *tx, restaurant_id, payload).await?;
        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "goal.create",
                "goal",
                json!({ "id": goal.id, "name": goal.name, "metric": goal.metric, "target": goal.target_value }),
            )
            .await?;

        tx.commit().await?;
        Ok(goal)
    }

    pub async fn update(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        id: Uuid,
        payload: &GoalPayload,
    ) -> Result<Goal, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        let goal = self
            .repo
            .update(&mut *tx, restaurant_id, id, payload)
            .await?
            .ok_or(AppError::ResourceNotFound(GOAL))?;
        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "goal.update",
                "goal",
                json!({ "id": id, "metric": goal.metric, "target": goal.target_value }),
            )
            .await?;

        tx.commit().await?;
        Ok(goal)
    }

    pub async fn delete(&self, restaurant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        if self.repo.delete(&mut *tx, restaurant_id, id).await? == 0 {
            return Err(AppError::ResourceNotFound(GOAL));
        }
        self.audit_repo
            .log(&mut *tx, user_id, Some(restaurant_id), "goal.delete", "goal", json!({ "id": id }))
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Recalcula o valor atual pela métrica e reavalia o status.
    pub async fn refresh_progress(&self, restaurant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<Goal, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        let goal = self
            .repo
            .find(&mut *tx, restaurant_id, id)
            .await?
            .ok_or(AppError::ResourceNotFound(GOAL))?;

        let current = self
            .repo
            .measure(&mut *tx, restaurant_id, goal.metric, goal.start_date, goal.end_date)
            .await?;
        let status = GoalStatus::evaluate(current, goal.target_value, goal.end_date, Utc::now().date_naive());

        let updated = self.repo.save_progress(&mut *tx, goal.id, current, status).await?;
        if updated.status != goal.status {
            self.audit_repo
                .log(
                    &mut *tx,
                    user_id,
                    Some(restaurant_id),
                    "goal.status",
                    "goal",
                    json!({ "id": id, "from": goal.status, "to": updated.status, "current": current }),
                )
                .await?;
        }

        tx.commit().await?;
        Ok(updated)
    }
}
