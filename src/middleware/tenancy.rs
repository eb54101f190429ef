// src/middleware/tenancy.rs

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::common::error::AppError;

// O nome do nosso cabeçalho HTTP customizado
pub const RESTAURANT_ID_HEADER: &str = "x-restaurant-id";

// O restaurante (tenant) que o usuário quer acessar nesta requisição
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestaurantContext(pub Uuid);

impl RestaurantContext {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let value = headers
            .get(RESTAURANT_ID_HEADER)
            .ok_or(AppError::MissingRestaurantContext)?;

        let value_str = value.to_str().map_err(|_| AppError::MissingRestaurantContext)?;

        Uuid::parse_str(value_str.trim())
            .map(RestaurantContext)
            .map_err(|_| AppError::MissingRestaurantContext)
    }
}

impl<S> FromRequestParts<S> for RestaurantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // O restaurant_guard já validou o vínculo e deixou o contexto nas extensions
        if let Some(ctx) = parts.extensions.get::<RestaurantContext>() {
            return Ok(*ctx);
        }
        RestaurantContext::from_headers(&parts.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    #[test]
    fn parses_uuid_header() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(RESTAURANT_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(RestaurantContext::from_headers(&headers).unwrap(), RestaurantContext(id));
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        let headers = HeaderMap::new();
        assert!(matches!(
            RestaurantContext::from_headers(&headers),
            Err(AppError::MissingRestaurantContext)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(RESTAURANT_ID_HEADER, HeaderValue::from_static("loja-centro"));
        assert!(matches!(
            RestaurantContext::from_headers(&headers),
            Err(AppError::MissingRestaurantContext)
        ));
    }

    #[tokio::test]
    async fn extensions_take_precedence_over_header() {
        let from_guard = Uuid::new_v4();
        let (mut parts, _) = Request::builder()
            .header(RESTAURANT_ID_HEADER, Uuid::new_v4().to_string())
            .body(())
            .unwrap()
            .into_parts();
        parts.extensions.insert(RestaurantContext(from_guard));

        let ctx = RestaurantContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.0, from_guard);
    }
}
