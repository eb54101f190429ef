// src/handlers/goals.rs

use axum::{
    extract::{Path, Query, State},
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
        rbac::{PermGoalsCreate, PermGoalsDelete, PermGoalsRead, PermGoalsUpdate, RequirePermission},
        tenancy::RestaurantContext,
    },
    models::goals::{GoalFilter, GoalPayload},
};

fn validate_goal(payload: &GoalPayload, locale: &Locale) -> Result<(), ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(locale))?;

    payload.validate_consistency().map_err(|e| {
        let mut errors = validator::ValidationErrors::new();
        errors.add("endDate", e);
        AppError::ValidationError(errors).to_api_error(locale)
    })
}

pub async fn list_goals(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermGoalsRead>,
    Query(filter): Query<GoalFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .goal_service
        .list(restaurant.0, user.0.id, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(page))
}

pub async fn get_goal(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermGoalsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let goal = app_state
        .goal_service
        .get(restaurant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(goal))
}

pub async fn create_goal(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermGoalsCreate>,
    Json(payload): Json<GoalPayload>,
) -> Result<impl IntoResponse, ApiError> {
    validate_goal(&payload, &locale)?;

    let goal = app_state
        .goal_service
        .create(restaurant.0, user.0.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(goal)))
}

pub async fn update_goal(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermGoalsUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GoalPayload>,
) -> Result<impl IntoResponse, ApiError> {
    validate_goal(&payload, &locale)?;

    let goal = app_state
        .goal_service
        .update(restaurant.0, user.0.id, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(goal))
}

pub async fn delete_goal(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermGoalsDelete>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .goal_service
        .delete(restaurant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(StatusCode::NO_CONTENT)
}

// Recalcula o valor atual a partir dos lançamentos e clientes
pub async fn refresh_progress(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermGoalsUpdate>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let goal = app_state
        .goal_service
        .refresh_progress(restaurant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(goal))
}
