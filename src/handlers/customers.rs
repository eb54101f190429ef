// src/handlers/customers.rs

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
        rbac::{
            PermCustomersCreate, PermCustomersRead, PermCustomersUpdate, PermSegmentsCreate,
            PermSegmentsDelete, PermSegmentsRead, PermSegmentsUpdate, RequirePermission,
        },
        tenancy::RestaurantContext,
    },
    models::customers::{CustomerFilter, CustomerPayload, SegmentPayload, VisitPayload},
};

fn validate_segment(payload: &SegmentPayload, locale: &Locale) -> Result<(), ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(locale))?;

    payload.validate_consistency().map_err(|e| {
        let mut errors = validator::ValidationErrors::new();
        errors.add("rules", e);
        AppError::ValidationError(errors).to_api_error(locale)
    })
}

// ---
// Clientes
// ---

pub async fn list_customers(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermCustomersRead>,
    Query(filter): Query<CustomerFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let customers = app_state
        .customer_service
        .list_customers(restaurant.0, user.0.id, filter.segment_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(customers))
}

pub async fn get_customer(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermCustomersRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = app_state
        .customer_service
        .get_customer(restaurant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(customer))
}

pub async fn create_customer(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermCustomersCreate>,
    Json(payload): Json<CustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let customer = app_state
        .customer_service
        .create_customer(restaurant.0, user.0.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn record_visit(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermCustomersUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VisitPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let customer = app_state
        .customer_service
        .record_visit(restaurant.0, user.0.id, id, payload.amount)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(customer))
}

// ---
// Segmentos
// ---

pub async fn list_segments(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermSegmentsRead>,
) -> Result<impl IntoResponse, ApiError> {
    let segments = app_state
        .customer_service
        .list_segments(restaurant.0, user.0.id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(segments))
}

pub async fn get_segment(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermSegmentsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let segment = app_state
        .customer_service
        .get_segment(restaurant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(segment))
}

pub async fn create_segment(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermSegmentsCreate>,
    Json(payload): Json<SegmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    validate_segment(&payload, &locale)?;

    let segment = app_state
        .customer_service
        .create_segment(restaurant.0, user.0.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(segment)))
}

pub async fn update_segment(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermSegmentsUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SegmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    validate_segment(&payload, &locale)?;

    let segment = app_state
        .customer_service
        .update_segment(restaurant.0, user.0.id, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(segment))
}

pub async fn delete_segment(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermSegmentsDelete>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .customer_service
        .delete_segment(restaurant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn apply_segmentation(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermSegmentsUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let result = app_state
        .customer_service
        .apply_segmentation(restaurant.0, user.0.id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(result))
}
