// src/services/menu_service.rs

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_scoped_tx, error::AppError},
    db::{AuditRepository, MenuRepository},
    models::menu::{Addon, AddonPayload, Category, CategoryPayload},
};

// Cardápio: cada chamada abre sua própria transação com as variáveis de RLS
#[derive(Clone)]
pub struct MenuService {
    pool: PgPool,
    repo: MenuRepository,
    audit_repo: AuditRepository,
}

const CATEGORY: &str = "Categoria";
const ADDON: &str = "Adicional";

impl MenuService {
    pub fn new(pool: PgPool, repo: MenuRepository, audit_repo: AuditRepository) -> Self {
        Self { pool, repo, audit_repo }
    }

    // ---
    // Categorias
    // ---

    pub async fn list_categories(&self, restaurant_id: Uuid, user_id: Uuid) -> Result<Vec<Category>, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;
        let categories = self.repo.list_categories(&mut *tx, restaurant_id).await?;
        tx.commit().await?;
        Ok(categories)
    }

    pub async fn get_category(&self, restaurant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<Category, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;
        let category = self
            .repo
            .find_category(&mut *tx, restaurant_id, id)
            .await?
            .ok_or(AppError::ResourceNotFound(CATEGORY))?;
        tx.commit().await?;
        Ok(category)
    }

    pub async fn create_category(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        payload: &CategoryPayload,
    ) -> Result<Category, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        let category = self
            .repo
            .create_category(&mut *tx, restaurant_id, payload.name.trim(), payload.sort_order)
            .await?;
        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "menu.category.create",
                "category",
                json!({ "id": category.id, "name": category.name }),
            )
            .await?;

        tx.commit().await?;
        Ok(category)
    }

    pub async fn update_category(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        id: Uuid,
        payload: &CategoryPayload,
    ) -> Result<Category, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        let category = self
            .repo
            .update_category(&mut *tx, restaurant_id, id, payload.name.trim(), payload.sort_order)
            .await?
            .ok_or(AppError::ResourceNotFound(CATEGORY))?;
        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "menu.category.update",
                "category",
                json!({ "id": id, "name": category.name, "sortOrder": category.sort_order }),
            )
            .await?;

        tx.commit().await?;
        Ok(category)
    }

    pub async fn set_category_active(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        id: Uuid,
        is_active: bool,
    ) -> Result<Category, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        let category = self
            .repo
            .set_category_active(&mut *tx, restaurant_id, id, is_active)
            .await?
            .ok_or(AppError::ResourceNotFound(CATEGORY))?;
        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "menu.category.status",
                "category",
                json!({ "id": id, "isActive": is_active }),
            )
            .await?;

        tx.commit().await?;
        Ok(category)
    }

    pub async fn delete_category(&self, restaurant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        if self.repo.delete_category(&mut *tx, restaurant_id, id).await? == 0 {
            return Err(AppError::ResourceNotFound(CATEGORY));
        }
        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "menu.category.delete",
                "category",
                json!({ "id": id }),
            )
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // ---
    // Adicionais
    // ---

    pub async fn list_addons(&self, restaurant_id: Uuid, user_id: Uuid) -> Result<Vec<Addon>, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;
        let addons = self.repo.list_addons(&mut *tx, restaurant_id).await?;
        tx.commit().await?;
        Ok(addons)
    }

    pub async fn get_addon(&self, restaurant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<Addon, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;
        let addon = self
            .repo
            .find_addon(&mut *tx, restaurant_id, id)
            .await?
            .ok_or(AppError::ResourceNotFound(ADDON))?;
        tx.commit().await?;
        Ok(addon)
    }

    pub async fn create_addon(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        payload: &AddonPayload,
    ) -> Result<Addon, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        let addon = self
            .repo
            .create_addon(&mut *tx, restaurant_id, payload.name.trim(), payload.price)
            .await?;
        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "menu.addon.create",
                "addon",
                json!({ "id": addon.id, "name": addon.name, "price": addon.price }),
            )
            .await?;

        tx.commit().await?;
        Ok(addon)
    }

    pub async fn update_addon(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        id: Uuid,
        payload: &AddonPayload,
    ) -> Result<Addon, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        let addon = self
            .repo
            .update_addon(&mut *tx, restaurant_id, id, payload.name.trim(), payload.price)
            .await?
            .ok_or(AppError::ResourceNotFound(ADDON))?;
        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "menu.addon.update",
                "addon",
                json!({ "id": id, "name": addon.name, "price": addon.price }),
            )
            .await?;

        tx.commit().await?;
        Ok(addon)
    }

    pub async fn set_addon_active(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        id: Uuid,
        is_active: bool,
    ) -> Result<Addon, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        let addon = self
            .repo
            .set_addon_active(&mut *tx, restaurant_id, id, is_active)
            .await?
            .ok_or(AppError::ResourceNotFound(ADDON))?;
        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "menu.addon.status",
                "addon",
                json!({ "id": id, "isActive": is_active }),
            )
            .await?;

        tx.commit().await?;
        Ok(addon)
    }

    pub async fn delete_addon(&self, restaurant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        if self.repo.delete_addon(&mut *tx, restaurant_id, id).await? == 0 {
            return Err(AppError::ResourceNotFound(ADDON));
        }
        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "menu.addon.delete",
                "addon",
                json!({ "id": id }),
            )
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
