// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, tenancy::RestaurantContext},
    models::auth::User,
};

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
        .ok_or(AppError::InvalidToken)
}

// ---
// auth_guard: só exige um token válido
// ---
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let locale = Locale::from_headers(request.headers());
    let reject = |e: AppError| e.to_api_error(&locale);

    let token = bearer_token(request.headers()).map_err(reject)?;
    let claims = app_state.auth_service.decode_claims(&token).map_err(reject)?;
    let user = app_state.auth_service.load_user(claims.sub).await.map_err(reject)?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

// ---
// restaurant_guard: token + X-Restaurant-ID + vínculo com o restaurante
// ---
// Tudo que não depende do banco é validado antes.
pub async fn restaurant_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let locale = Locale::from_headers(request.headers());
    let reject = |e: AppError| e.to_api_error(&locale);

    let token = bearer_token(request.headers()).map_err(reject)?;
    let claims = app_state.auth_service.decode_claims(&token).map_err(reject)?;
    let context = RestaurantContext::from_headers(request.headers()).map_err(reject)?;

    let user = app_state.auth_service.load_user(claims.sub).await.map_err(reject)?;
    if !user.is_superadmin {
        let membership = app_state
            .restaurant_service
            .membership(user.id, context.0)
            .await
            .map_err(reject)?;
        if membership.is_none() {
            return Err(reject(AppError::NotRestaurantMember));
        }
    }

    request.extensions_mut().insert(AuthenticatedUser(user));
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn rejects_missing_or_non_bearer_authorization() {
        assert!(matches!(bearer_token(&HeaderMap::new()), Err(AppError::InvalidToken)));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(matches!(bearer_token(&headers), Err(AppError::InvalidToken)));
    }
}
