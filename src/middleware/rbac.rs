// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::RestaurantContext},
    models::permission::PermissionDecision,
};

/// 1. O Trait que define o que é uma Permissão: (funcionalidade, ação) do catálogo
pub trait PermissionDef: Send + Sync + 'static {
    const FEATURE: &'static str;
    const ACTION: &'static str;
}

/// 2. O Extractor (Guardião). Exige que a rota esteja atrás do `restaurant_guard`.
pub struct RequirePermission<T> {
    pub decision: PermissionDecision,
    _marker: PhantomData<T>,
}

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_headers(&parts.headers);

        // A. Usuário e restaurante deixados pelo restaurant_guard
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::InvalidToken.to_api_error(&locale))?;
        let restaurant = parts
            .extensions
            .get::<RestaurantContext>()
            .copied()
            .ok_or_else(|| AppError::MissingRestaurantContext.to_api_error(&locale))?;

        // B. Resolve pelo snapshot (402 se bloqueado pelo plano, 403 se negado)
        let decision = app_state
            .permission_service
            .require(&user.0, restaurant.0, T::FEATURE, T::ACTION)
            .await
            .map_err(|e| e.to_api_error(&locale))?;

        Ok(RequirePermission { decision, _marker: PhantomData })
    }
}

/// Só superadmins da plataforma passam.
pub struct RequireSuperadmin;

impl<S> FromRequestParts<S> for RequireSuperadmin
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let locale = Locale::from_headers(&parts.headers);
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::InvalidToken.to_api_error(&locale))?;

        if !user.0.is_superadmin {
            let message = if locale.is_english() {
                "Only platform administrators can change entitlements."
            } else {
                "Apenas administradores da plataforma podem alterar entitlements."
            };
            return Err(AppError::Forbidden(message.into()).to_api_error(&locale));
        }
        Ok(RequireSuperadmin)
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

macro_rules! permissions {
    ($($name:ident => ($feature:literal, $action:literal);)*) => {
        $(
            pub struct $name;
            impl PermissionDef for $name {
                const FEATURE: &'static str = $feature;
                const ACTION: &'static str = $action;
            }
        )*
    };
}

permissions! {
    PermRolesRead => ("admin:iam:roles", "read");
    PermRolesCreate => ("admin:iam:roles", "create");
    PermRolesUpdate => ("admin:iam:roles", "update");
    PermRolesDelete => ("admin:iam:roles", "delete");
    PermUsersRead => ("admin:iam:users", "read");
    PermUsersUpdate => ("admin:iam:users", "update");
    PermEntitlementsRead => ("admin:iam:entitlements", "read");
    PermCategoriesRead => ("erp:menu:categories", "read");
    PermCategoriesCreate => ("erp:menu:categories", "create");
    PermCategoriesUpdate => ("erp:menu:categories", "update");
    PermCategoriesDelete => ("erp:menu:categories", "delete");
    PermAddonsRead => ("erp:menu:addons", "read");
    PermAddonsCreate => ("erp:menu:addons", "create");
    PermAddonsUpdate => ("erp:menu:addons", "update");
    PermAddonsDelete => ("erp:menu:addons", "delete");
    PermStockItemsRead => ("erp:stock:items", "read");
    PermStockItemsCreate => ("erp:stock:items", "create");
    PermStockItemsUpdate => ("erp:stock:items", "update");
    PermStockItemsDelete => ("erp:stock:items", "delete");
    PermStockMovementsRead => ("erp:stock:movements", "read");
    PermStockMovementsCreate => ("erp:stock:movements", "create");
    PermFinancialCategoriesRead => ("erp:financial:categories", "read");
    PermFinancialCategoriesCreate => ("erp:financial:categories", "create");
    PermTransactionsRead => ("erp:financial:transactions", "read");
    PermTransactionsCreate => ("erp:financial:transactions", "create");
    PermTransactionsDelete => ("erp:financial:transactions", "delete");
    PermGoalsRead => ("erp:management:goals", "read");
    PermGoalsCreate => ("erp:management:goals", "create");
    PermGoalsUpdate => ("erp:management:goals", "update");
    PermGoalsDelete => ("erp:management:goals", "delete");
    PermCustomersRead => ("erp:customers:records", "read");
    PermCustomersCreate => ("erp:customers:records", "create");
    PermCustomersUpdate => ("erp:customers:records", "update");
    PermSegmentsRead => ("erp:customers:segmentation", "read");
    PermSegmentsCreate => ("erp:customers:segmentation", "create");
    PermSegmentsUpdate => ("erp:customers:segmentation", "update");
    PermSegmentsDelete => ("erp:customers:segmentation", "delete");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_types_point_at_catalog_keys() {
        assert_eq!(PermRolesCreate::FEATURE, "admin:iam:roles");
        assert_eq!(PermRolesCreate::ACTION, "create");
        assert_eq!(PermAddonsDelete::FEATURE, "erp:menu:addons");
        assert_eq!(PermAddonsDelete::ACTION, "delete");
        assert_eq!(PermStockMovementsCreate::FEATURE, "erp:stock:movements");
        assert_eq!(PermTransactionsRead::FEATURE, "erp:financial:transactions");
        assert_eq!(PermSegmentsUpdate::ACTION, "update");
    }
}
