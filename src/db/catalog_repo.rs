// src/db/catalog_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        catalog::{Action, CatalogTree, Feature, FeatureListing, Module, Submodule},
        entitlement::EntityType,
    },
};

// Leitura do catálogo fixo (módulos, submódulos, funcionalidades e ações)
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Carrega o catálogo inteiro e monta a árvore, já na ordem de exibição.
    pub async fn load_tree(&self) -> Result<CatalogTree, AppError> {
        let modules = sqlx::query_as::<_, Module>(
            "SELECT id, key, name, description, visible, sort_order FROM modules ORDER BY sort_order, key",
        )
        .fetch_all(&self.pool)
        .await?;

        let submodules = sqlx::query_as::<_, Submodule>(
            r#"
            SELECT id, module_id, key, name, description, sort_order
            FROM submodules
            ORDER BY sort_order, key
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let features = sqlx::query_as::<_, Feature>(
            r#"
            SELECT id, submodule_id, key, name, description, sort_order, flags
            FROM features
            ORDER BY sort_order, key
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let actions = self.list_actions().await?;

        Ok(CatalogTree::assemble(modules, submodules, features, actions))
    }

    pub async fn list_actions(&self) -> Result<Vec<Action>, AppError> {
        let actions = sqlx::query_as::<_, Action>("SELECT id, key FROM actions ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(actions)
    }

    /// Lista plana de funcionalidades (para as telas de cargos e overrides).
    pub async fn list_features(&self) -> Result<Vec<FeatureListing>, AppError> {
        let features = sqlx::query_as::<_, FeatureListing>(
            r#"
            SELECT f.id, f.key, f.name, f.description,
                   s.id AS submodule_id, s.key AS submodule_key,
                   m.id AS module_id, m.key AS module_key
            FROM features f
            JOIN submodules s ON s.id = f.submodule_id
            JOIN modules m ON m.id = s.module_id
            ORDER BY m.sort_order, s.sort_order, f.sort_order, f.key
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(features)
    }

    /// Filtra `ids`, devolvendo só os que existem na tabela do tipo informado.
    pub async fn existing_entity_ids<'e, E>(
        &self,
        executor: E,
        entity_type: EntityType,
        ids: &[Uuid],
    ) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // O nome da tabela vem de um enum fechado, nunca da entrada do usuário
        let table = match entity_type {
            EntityType::Module => "modules",
            EntityType::Submodule => "submodules",
            EntityType::Feature => "features",
        };
        let sql = format!("SELECT id FROM {} WHERE id = ANY($1)", table);

        let found: Vec<Uuid> = sqlx::query_scalar(&sql)
            .bind(ids)
            .fetch_all(executor)
            .await?;

        Ok(found)
    }

    /// Todos os nós (módulo, submódulos e funcionalidades) sob um módulo.
    pub async fn module_subtree<'e, E>(
        &self,
        executor: E,
        module_key: &str,
    ) -> Result<Vec<(EntityType, Uuid)>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows: Vec<(EntityType, Uuid)> = sqlx::query_as(
            r#"
            SELECT 'module'::entitlement_entity, m.id FROM modules m WHERE m.key = $1
            UNION ALL
            SELECT 'submodule'::entitlement_entity, s.id
            FROM submodules s JOIN modules m ON m.id = s.module_id
            WHERE m.key = $1
            UNION ALL
            SELECT 'feature'::entitlement_entity, f.id
            FROM features f
            JOIN submodules s ON s.id = f.submodule_id
            JOIN modules m ON m.id = s.module_id
            WHERE m.key = $1
            "#,
        )
        .bind(module_key)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }
}
