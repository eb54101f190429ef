// src/services/restaurant_service.rs

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AuditRepository, CatalogRepository, EntitlementRepository, RestaurantRepository},
    models::{
        entitlement::EntitlementStatus,
        restaurant::{MemberListing, Restaurant, RestaurantMember},
    },
};

// Módulo liberado para todo restaurante novo (equipe, cargos e permissões)
const BASE_MODULE_KEY: &str = "admin";
const ONBOARDING_SOURCE: &str = "onboarding";

#[derive(Clone)]
pub struct RestaurantService {
    pool: PgPool,
    restaurant_repo: RestaurantRepository,
    catalog_repo: CatalogRepository,
    entitlement_repo: EntitlementRepository,
    audit_repo: AuditRepository,
}

impl RestaurantService {
    pub fn new(
        pool: PgPool,
        restaurant_repo: RestaurantRepository,
        catalog_repo: CatalogRepository,
        entitlement_repo: EntitlementRepository,
        audit_repo: AuditRepository,
    ) -> Self {
        Self { pool, restaurant_repo, catalog_repo, entitlement_repo, audit_repo }
    }

    /// Cria o restaurante, registra o criador como dono e libera o módulo base.
    /// Tudo ou nada.
    pub async fn create_restaurant_with_owner(
        &self,
        owner_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Restaurant, AppError> {
        let mut tx = self.pool.begin().await?;

        let restaurant = self
            .restaurant_repo
            .create_restaurant(&mut *tx, name, description)
            .await?;

        self.restaurant_repo
            .add_member(&mut *tx, restaurant.id, owner_id, true)
            .await?;

        let base_nodes = self.catalog_repo.module_subtree(&mut *tx, BASE_MODULE_KEY).await?;
        let metadata = json!({});
        for (entity_type, entity_id) in &base_nodes {
            self.entitlement_repo
                .upsert(
                    &mut *tx,
                    restaurant.id,
                    *entity_type,
                    *entity_id,
                    EntitlementStatus::Active,
                    ONBOARDING_SOURCE,
                    &metadata,
                )
                .await?;
        }

        self.audit_repo
            .log(
                &mut *tx,
                owner_id,
                Some(restaurant.id),
                "restaurant.create",
                "restaurant",
                json!({ "name": name, "entitlements": base_nodes.len() }),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(restaurant_id = %restaurant.id, %owner_id, "Restaurante criado");
        Ok(restaurant)
    }

    pub async fn list_my_restaurants(&self, user_id: Uuid) -> Result<Vec<Restaurant>, AppError> {
        self.restaurant_repo.find_restaurants_for_user(user_id).await
    }

    pub async fn membership(
        &self,
        user_id: Uuid,
        restaurant_id: Uuid,
    ) -> Result<Option<RestaurantMember>, AppError> {
        self.restaurant_repo.find_membership(user_id, restaurant_id).await
    }

    pub async fn list_members(&self, restaurant_id: Uuid) -> Result<Vec<MemberListing>, AppError> {
        self.restaurant_repo.list_members(restaurant_id).await
    }
}
