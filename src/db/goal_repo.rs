// src/db/goal_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::goals::{Goal, GoalFilter, GoalMetric, GoalPayload, GoalStatus},
};

#[derive(Clone, Default)]
pub struct GoalRepository;

impl GoalRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        filter: &GoalFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Goal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let goals = sqlx::query_as::<_, Goal>(
            r#"
            SELECT * FROM goals
            WHERE restaurant_id = $1
              AND ($2::goal_status IS NULL OR status = $2)
              AND ($3::goal_metric IS NULL OR metric = $3)
            ORDER BY end_date ASC, name ASC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(restaurant_id)
        .bind(filter.status)
        .bind(filter.metric)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;
        Ok(goals)
    }

    pub async fn count<'e, E>(&self, executor: E, restaurant_id: Uuid, filter: &GoalFilter) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM goals
            WHERE restaurant_id = $1
              AND ($2::goal_status IS NULL OR status = $2)
              AND ($3::goal_metric IS NULL OR metric = $3)
            "#,
        )
        .bind(restaurant_id)
        .bind(filter.status)
        .bind(filter.metric)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }

    pub async fn find<'e, E>(&self, executor: E, restaurant_id: Uuid, id: Uuid) -> Result<Option<Goal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let goal = sqlx::query_as::<_, Goal>("SELECT * FROM goals WHERE id = $1 AND restaurant_id = $2")
            .bind(id)
            .bind(restaurant_id)
            .fetch_optional(executor)
            .await?;
        Ok(goal)
    }

    pub async fn create<'e, E>(&self, executor: E, restaurant_id: Uuid, payload: &GoalPayload) -> Result<Goal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let goal = sqlx::query_as::<_, Goal>(
            r#"
            INSERT INTO goals (restaurant_id, name, description, metric, target_value, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(restaurant_id)
        .bind(payload.name.trim())
        .bind(payload.description.as_deref())
        .bind(payload.metric)
        .bind(payload.target_value)
        .bind(payload.start_date)
        .bind(payload.end_date)
        .fetch_one(executor)
        .await?;
        Ok(goal)
    }

    /// Mudar a definição zera o progresso; o próximo recálculo define o status.
    pub async fn update<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        id: Uuid,
        payload: &GoalPayload,
    ) -> Result<Option<Goal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let goal = sqlx::query_as::<_, Goal>(
            r#"
            UPDATE goals
            SET name = $3, description = $4, metric = $5, target_value = $6,
                start_date = $7, end_date = $8,
                current_value = 0, status = 'active', updated_at = now()
            WHERE id = $1 AND restaurant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(restaurant_id)
        .bind(payload.name.trim())
        .bind(payload.description.as_deref())
        .bind(payload.metric)
        .bind(payload.target_value)
        .bind(payload.start_date)
        .bind(payload.end_date)
        .fetch_optional(executor)
        .await?;
        Ok(goal)
    }

    pub async fn delete<'e, E>(&self, executor: E, restaurant_id: Uuid, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM goals WHERE id = $1 AND restaurant_id = $2")
            .bind(id)
            .bind(restaurant_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn save_progress<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        current_value: Decimal,
        status: GoalStatus,
    ) -> Result<Goal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let goal = sqlx::query_as::<_, Goal>(
            r#"
            UPDATE goals SET current_value = $2, status = $3, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(current_value)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(goal)
    }

    /// Valor atual da métrica no período da meta (datas inclusivas).
    pub async fn measure<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        metric: GoalMetric,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = match metric {
            GoalMetric::Revenue => {
                r#"
                SELECT COALESCE(SUM(amount), 0)::numeric FROM financial_transactions
                WHERE restaurant_id = $1 AND kind = 'income' AND transaction_date BETWEEN $2 AND $3
                "#
            }
            GoalMetric::NetCashFlow => {
                r#"
                SELECT COALESCE(SUM(CASE WHEN kind = 'income' THEN amount ELSE -amount END), 0)::numeric
                FROM financial_transactions
                WHERE restaurant_id = $1 AND transaction_date BETWEEN $2 AND $3
                "#
            }
            GoalMetric::NewCustomers => {
                r#"
                SELECT COUNT(*)::numeric FROM customers
                WHERE restaurant_id = $1 AND created_at::date BETWEEN $2 AND $3
                "#
            }
            GoalMetric::CustomerSpend => {
                r#"
                SELECT COALESCE(SUM(total_spent), 0)::numeric FROM customers
                WHERE restaurant_id = $1 AND last_visit_at::date BETWEEN $2 AND $3
                "#
            }
        };

        let value = sqlx::query_scalar::<_, Decimal>(sql)
            .bind(restaurant_id)
            .bind(start)
            .bind(end)
            .fetch_one(executor)
            .await?;
        Ok(value)
    }
}
