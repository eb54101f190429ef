// src/handlers/menu.rs

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
            PermAddonsCreate, PermAddonsDelete, PermAddonsRead, PermAddonsUpdate,
            PermCategoriesCreate, PermCategoriesDelete, PermCategoriesRead,
            PermCategoriesUpdate, RequirePermission,
        },
        tenancy::RestaurantContext,
    },
    models::menu::{AddonPayload, CategoryPayload, StatusPayload},
};

// ---
// Categorias
// ---

pub async fn list_categories(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermCategoriesRead>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = app_state
        .menu_service
        .list_categories(restaurant.0, user.0.id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(categories))
}

pub async fn get_category(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermCategoriesRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let category = app_state
        .menu_service
        .get_category(restaurant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(category))
}

pub async fn create_category(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermCategoriesCreate>,
    Json(payload): Json<CategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let category = app_state
        .menu_service
        .create_category(restaurant.0, user.0.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermCategoriesUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let category = app_state
        .menu_service
        .update_category(restaurant.0, user.0.id, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(category))
}

pub async fn set_category_status(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermCategoriesUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let category = app_state
        .menu_service
        .set_category_active(restaurant.0, user.0.id, id, payload.is_active)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(category))
}

pub async fn delete_category(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermCategoriesDelete>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .menu_service
        .delete_category(restaurant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Adicionais
// ---

pub async fn list_addons(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermAddonsRead>,
) -> Result<impl IntoResponse, ApiError> {
    let addons = app_state
        .menu_service
        .list_addons(restaurant.0, user.0.id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(addons))
}

pub async fn get_addon(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermAddonsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let addon = app_state
        .menu_service
        .get_addon(restaurant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(addon))
}

pub async fn create_addon(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermAddonsCreate>,
    Json(payload): Json<AddonPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let addon = app_state
        .menu_service
        .create_addon(restaurant.0, user.0.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(addon)))
}

pub async fn update_addon(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermAddonsUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddonPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let addon = app_state
        .menu_service
        .update_addon(restaurant.0, user.0.id, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(addon))
}

pub async fn set_addon_status(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermAddonsUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let addon = app_state
        .menu_service
        .set_addon_active(restaurant.0, user.0.id, id, payload.is_active)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(addon))
}

pub async fn delete_addon(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermAddonsDelete>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .menu_service
        .delete_addon(restaurant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(StatusCode::NO_CONTENT)
}
