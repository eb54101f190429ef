// src/handlers/iam.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{
            PermEntitlementsRead, PermRolesCreate, PermRolesDelete, PermRolesRead,
            PermRolesUpdate, PermUsersRead, PermUsersUpdate, RequirePermission,
            RequireSuperadmin,
        },
        tenancy::RestaurantContext,
    },
    models::{
        entitlement::{BulkEntitlementsPayload, RemoveEntitlementPayload, SetEntitlementPayload},
        permission::{CheckPermissionPayload, PermissionSnapshot},
        rbac::{
            CreateRolePayload, SetRolePermissionsPayload, SetUserOverridesPayload,
            UpdateRolePayload, UserRolePayload,
        },
    },
};

// ---
// Catálogo
// ---

// GET /api/iam/features
pub async fn list_features(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let features = app_state
        .iam_service
        .list_features()
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(features))
}

// GET /api/iam/actions
pub async fn list_actions(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let actions = app_state
        .iam_service
        .list_actions()
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(actions))
}

// ---
// Permissões efetivas do usuário logado
// ---

// GET /api/iam/tree
pub async fn get_permission_tree(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = app_state
        .permission_service
        .snapshot(&user.0, restaurant.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(PermissionSnapshot::clone(&snapshot)))
}

// POST /api/iam/check
// Responde 200 mesmo quando negado; o corpo diz o motivo.
pub async fn check_permission(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    Json(payload): Json<CheckPermissionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let decision = app_state
        .permission_service
        .check(&user.0, restaurant.0, &payload.feature_key, &payload.action_key)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(json!({
        "featureKey": payload.feature_key,
        "actionKey": payload.action_key,
        "allowed": decision.allowed,
        "locked": decision.locked,
        "reason": decision.reason,
    })))
}

// ---
// Cargos
// ---

// GET /api/iam/roles
pub async fn list_roles(
    State(app_state): State<AppState>,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermRolesRead>,
) -> Result<impl IntoResponse, ApiError> {
    let roles = app_state
        .iam_service
        .list_roles(restaurant.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(roles))
}

// POST /api/iam/roles
pub async fn create_role(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermRolesCreate>,
    Json(payload): Json<CreateRolePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let role = app_state
        .iam_service
        .create_role(user.0.id, restaurant.0, payload.key.trim(), payload.name.trim())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(role)))
}

// PATCH /api/iam/roles/{id}
pub async fn update_role(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermRolesUpdate>,
    Path(role_id): Path<Uuid>,
    Json(payload): Json<UpdateRolePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let role = app_state
        .iam_service
        .update_role(user.0.id, restaurant.0, role_id, payload.name.trim())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(role))
}

// DELETE /api/iam/roles/{id}
pub async fn delete_role(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermRolesDelete>,
    Path(role_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .iam_service
        .delete_role(user.0.id, restaurant.0, role_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

// GET /api/iam/roles/{id}/permissions
pub async fn get_role_permissions(
    State(app_state): State<AppState>,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermRolesRead>,
    Path(role_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let permissions = app_state
        .iam_service
        .get_role_permissions(restaurant.0, role_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(permissions))
}

// POST /api/iam/roles/{id}/permissions
pub async fn set_role_permissions(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermRolesUpdate>,
    Path(role_id): Path<Uuid>,
    Json(payload): Json<SetRolePermissionsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let permissions = app_state
        .iam_service
        .set_role_permissions(user.0.id, restaurant.0, role_id, &payload.permissions)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(permissions))
}

// ---
// Cargos e overrides dos usuários
// ---

// GET /api/iam/users/{id}/roles
pub async fn list_user_roles(
    State(app_state): State<AppState>,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermUsersRead>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let roles = app_state
        .iam_service
        .list_user_roles(restaurant.0, user_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(roles))
}

// POST /api/iam/users/{id}/roles
pub async fn assign_user_role(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermUsersUpdate>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UserRolePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let roles = app_state
        .iam_service
        .assign_user_role(user.0.id, restaurant.0, user_id, payload.role_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(roles))
}

// DELETE /api/iam/users/{id}/roles/{role_id}
pub async fn remove_user_role(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermUsersUpdate>,
    Path((user_id, role_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .iam_service
        .remove_user_role(user.0.id, restaurant.0, user_id, role_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/iam/users/{id}/overrides
pub async fn get_user_overrides(
    State(app_state): State<AppState>,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermUsersRead>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let overrides = app_state
        .iam_service
        .get_user_overrides(restaurant.0, user_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(overrides))
}

// POST /api/iam/users/{id}/overrides
pub async fn set_user_overrides(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermUsersUpdate>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<SetUserOverridesPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let overrides = app_state
        .iam_service
        .set_user_overrides(user.0.id, restaurant.0, user_id, &payload.overrides)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(overrides))
}

// DELETE /api/iam/users/{id}/overrides/{feature_id}/{action_id}
pub async fn delete_user_override(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermUsersUpdate>,
    Path((user_id, feature_id, action_id)): Path<(Uuid, Uuid, i16)>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .iam_service
        .delete_user_override(user.0.id, restaurant.0, user_id, feature_id, action_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Entitlements
// ---

// GET /api/iam/entitlements
pub async fn list_entitlements(
    State(app_state): State<AppState>,
    restaurant: RestaurantContext,
    locale: Locale,
    _guard: RequirePermission<PermEntitlementsRead>,
) -> Result<impl IntoResponse, ApiError> {
    let entitlements = app_state
        .iam_service
        .list_entitlements(restaurant.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(entitlements))
}

// POST /api/admin/entitlements
pub async fn set_entitlement(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    locale: Locale,
    _guard: RequireSuperadmin,
    Json(payload): Json<SetEntitlementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let outcome = app_state
        .iam_service
        .set_entitlement(user.0.id, payload.restaurant_id, &payload.entitlement)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(json!({ "result": outcome })))
}

// POST /api/admin/entitlements/bulk
pub async fn set_entitlements_bulk(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    locale: Locale,
    _guard: RequireSuperadmin,
    Json(payload): Json<BulkEntitlementsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let result = app_state
        .iam_service
        .set_entitlements_bulk(user.0.id, payload.restaurant_id, &payload.entitlements)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(result))
}

// DELETE /api/admin/entitlements
pub async fn remove_entitlement(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    locale: Locale,
    _guard: RequireSuperadmin,
    Json(payload): Json<RemoveEntitlementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .iam_service
        .remove_entitlement(user.0.id, payload.restaurant_id, payload.entity_type, payload.entity_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(StatusCode::NO_CONTENT)
}
