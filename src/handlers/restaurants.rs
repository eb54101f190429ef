// src/handlers/restaurants.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermUsersRead, RequirePermission},
        tenancy::RestaurantContext,
    },
    models::restaurant::CreateRestaurantPayload,
};

// POST /api/restaurants
pub async fn create_restaurant(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    locale: Locale,
    Json(payload): Json<CreateRestaurantPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let restaurant = app_state
        .restaurant_service
        .create_restaurant_with_owner(user.0.id, payload.name.trim(), payload.description.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(restaurant)))
}

// GET /api/restaurants
pub async fn list_my_restaurants(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let restaurants = app_state
        .restaurant_service
        .list_my_restaurants(user.0.id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(restaurants))
}

// GET /api/restaurants/members
pub async fn list_members(
    State(app_state): State<AppState>,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermUsersRead>,
) -> Result<impl IntoResponse, ApiError> {
    let members = app_state
        .restaurant_service
        .list_members(restaurant.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(members))
}
