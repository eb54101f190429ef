// src/db/entitlement_repo.rs

use serde_json::Value;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::entitlement::{EntitlementStatus, Entitlement, EntityType, UpsertOutcome},
};

#[derive(Clone)]
pub struct EntitlementRepository {
    pool: PgPool,
}

impl EntitlementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_restaurant(&self, restaurant_id: Uuid) -> Result<Vec<Entitlement>, AppError> {
        let entitlements = sqlx::query_as::<_, Entitlement>(
            r#"
            SELECT restaurant_id, entity_type, entity_id, status, source, metadata, created_at, updated_at
            FROM restaurant_entitlements
            WHERE restaurant_id = $1
            ORDER BY entity_type, entity_id
            "#,
        )
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entitlements)
    }

    /// Insere ou atualiza. Só toca a linha se status, origem ou metadata mudarem.
    pub async fn upsert<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        entity_type: EntityType,
        entity_id: Uuid,
        status: EntitlementStatus,
        source: &str,
        metadata: &Value,
    ) -> Result<UpsertOutcome, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // `xmax = 0` só é verdadeiro para a linha recém-inserida
        let created: Option<bool> = sqlx::query_scalar(
            r#"
            INSERT INTO restaurant_entitlements
                (restaurant_id, entity_type, entity_id, status, source, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (restaurant_id, entity_type, entity_id) DO UPDATE
            SET status = EXCLUDED.status,
                source = EXCLUDED.source,
                metadata = EXCLUDED.metadata,
                updated_at = now()
            WHERE (restaurant_entitlements.status, restaurant_entitlements.source, restaurant_entitlements.metadata)
                IS DISTINCT FROM (EXCLUDED.status, EXCLUDED.source, EXCLUDED.metadata)
            RETURNING (xmax = 0)
            "#,
        )
        .bind(restaurant_id)
        .bind(entity_type)
        .bind(entity_id)
        .bind(status)
        .bind(source)
        .bind(metadata)
        .fetch_optional(executor)
        .await?;

        Ok(match created {
            Some(true) => UpsertOutcome::Created,
            Some(false) => UpsertOutcome::Updated,
            None => UpsertOutcome::Unchanged,
        })
    }

    /// Remove o entitlement; devolve quantas linhas saíram (0 ou 1).
    pub async fn remove<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            DELETE FROM restaurant_entitlements
            WHERE restaurant_id = $1 AND entity_type = $2 AND entity_id = $3
            "#,
        )
        .bind(restaurant_id)
        .bind(entity_type)
        .bind(entity_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
