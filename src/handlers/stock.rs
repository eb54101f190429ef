// src/handlers/stock.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{
            PermStockItemsCreate, PermStockItemsDelete, PermStockItemsRead, PermStockItemsUpdate,
            PermStockMovementsCreate, PermStockMovementsRead, RequirePermission,
        },
        tenancy::RestaurantContext,
    },
    models::stock::{StockItemPayload, StockMovementPayload},
};

// ---
// Itens
// ---

pub async fn list_items(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermStockItemsRead>,
) -> Result<impl IntoResponse, ApiError> {
    let items = app_state
        .stock_service
        .list_items(restaurant.0, user.0.id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(items))
}

pub async fn get_item(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermStockItemsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .stock_service
        .get_item(restaurant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(item))
}

pub async fn create_item(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermStockItemsCreate>,
    Json(payload): Json<StockItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let item = app_state
        .stock_service
        .create_item(restaurant.0, user.0.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermStockItemsUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let item = app_state
        .stock_service
        .update_item(restaurant.0, user.0.id, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(item))
}

pub async fn delete_item(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermStockItemsDelete>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .stock_service
        .delete_item(restaurant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Movimentações
// ---

pub async fn item_movements(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermStockMovementsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let movements = app_state
        .stock_service
        .item_history(restaurant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(movements))
}

pub async fn create_movement(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermStockMovementsCreate>,
    Json(payload): Json<StockMovementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    payload.validate_consistency().map_err(|e| {
        let mut errors = validator::ValidationErrors::new();
        errors.add("reason", e);
        AppError::ValidationError(errors).to_api_error(&locale)
    })?;

    let movement = app_state
        .stock_service
        .record_movement(restaurant.0, user.0.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(movement)))
}

pub async fn dashboard(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermStockItemsRead>,
) -> Result<impl IntoResponse, ApiError> {
    let dashboard = app_state
        .stock_service
        .dashboard(restaurant.0, user.0.id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(dashboard))
}
