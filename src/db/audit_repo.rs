// src/db/audit_repo.rs

use serde_json::Value;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;

// Trilha de auditoria das mudanças administrativas
#[derive(Clone, Default)]
pub struct AuditRepository;

impl AuditRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn log<'e, E>(
        &self,
        executor: E,
        actor_user_id: Uuid,
        restaurant_id: Option<Uuid>,
        action: &str,
        resource: &str,
        payload: Value,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (actor_user_id, restaurant_id, action, resource, payload)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(actor_user_id)
        .bind(restaurant_id)
        .bind(action)
        .bind(resource)
        .bind(payload)
        .execute(executor)
        .await?;

        Ok(())
    }
}
