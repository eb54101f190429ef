// src/handlers/finance.rs

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
            PermFinancialCategoriesCreate, PermFinancialCategoriesRead, PermTransactionsCreate,
            PermTransactionsDelete, PermTransactionsRead, RequirePermission,
        },
        tenancy::RestaurantContext,
    },
    models::finance::{
        CashFlowQuery, CategoryFilter, FinancialCategoryPayload, FinancialTransactionPayload, TransactionFilter,
    },
};

fn period_error(e: validator::ValidationError, locale: &Locale) -> ApiError {
    let mut errors = validator::ValidationErrors::new();
    errors.add("endDate", e);
    AppError::ValidationError(errors).to_api_error(locale)
}

// ---
// Categorias
// ---

pub async fn list_categories(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermFinancialCategoriesRead>,
    Query(filter): Query<CategoryFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = app_state
        .finance_service
        .list_categories(restaurant.0, user.0.id, filter.kind)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermFinancialCategoriesCreate>,
    Json(payload): Json<FinancialCategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let category = app_state
        .finance_service
        .create_category(restaurant.0, user.0.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(category)))
}

// ---
// Lançamentos
// ---

pub async fn list_transactions(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermTransactionsRead>,
    Query(filter): Query<TransactionFilter>,
) -> Result<impl IntoResponse, ApiError> {
    filter.validate_consistency().map_err(|e| period_error(e, &locale))?;

    let transactions = app_state
        .finance_service
        .list_transactions(restaurant.0, user.0.id, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(transactions))
}

pub async fn get_transaction(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermTransactionsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction = app_state
        .finance_service
        .get_transaction(restaurant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(transaction))
}

pub async fn create_transaction(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermTransactionsCreate>,
    Json(payload): Json<FinancialTransactionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let transaction = app_state
        .finance_service
        .create_transaction(restaurant.0, user.0.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

pub async fn delete_transaction(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermTransactionsDelete>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .finance_service
        .delete_transaction(restaurant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cash_flow(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermTransactionsRead>,
    Query(query): Query<CashFlowQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (start, end) = query.period().map_err(|e| period_error(e, &locale))?;

    let report = app_state
        .finance_service
        .cash_flow(restaurant.0, user.0.id, start, end)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(report))
}
