#![allow(dead_code)]

use axum::{body::Body, http::Request, Router};
use restaurant_backend::{
    config::{AppState, Config},
    db::CatalogRepository,
    models::{
        auth::User,
        entitlement::{EntitlementInput, EntitlementStatus},
    },
    router::build_router,
};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

pub const TEST_SECRET: &str = "segredo-dos-testes";

// Pool preguiçosa: as rotas testadas aqui respondem antes de tocar o banco
pub fn test_state() -> AppState {
    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://postgres@127.0.0.1:1/restaurante_test".to_string()),
        "JWT_SECRET" => Some(TEST_SECRET.to_string()),
        _ => None,
    })
    .expect("config");

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect_lazy(&config.database_url)
        .expect("lazy pool");

    AppState::from_pool(pool, &config)
}

pub fn app() -> (Router, AppState) {
    let state = test_state();
    (build_router(state.clone()), state)
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

// ---
// Banco real (#[sqlx::test] entrega uma pool já migrada)
// ---

pub fn db_state(pool: sqlx::PgPool) -> AppState {
    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://gerenciada-pelo-sqlx-test".to_string()),
        "JWT_SECRET" => Some(TEST_SECRET.to_string()),
        _ => None,
    })
    .expect("config");
    AppState::from_pool(pool, &config)
}

pub async fn new_user(state: &AppState, email: &str) -> User {
    let token = state
        .auth_service
        .register_user(email, "senha-bem-forte")
        .await
        .expect("register");
    let claims = state.auth_service.decode_claims(&token).expect("claims");
    state.auth_service.load_user(claims.sub).await.expect("user")
}

pub async fn new_restaurant(state: &AppState, owner: &User, name: &str) -> Uuid {
    state
        .restaurant_service
        .create_restaurant_with_owner(owner.id, name, None)
        .await
        .expect("restaurant")
        .id
}

/// Libera todo o módulo (módulo, submódulos e funcionalidades) para o restaurante.
pub async fn entitle_module(
    state: &AppState,
    pool: &sqlx::PgPool,
    actor: &User,
    restaurant_id: Uuid,
    module_key: &str,
) -> Vec<EntitlementInput> {
    let nodes = CatalogRepository::new(pool.clone())
        .module_subtree(pool, module_key)
        .await
        .expect("subtree");
    let inputs: Vec<EntitlementInput> = nodes
        .into_iter()
        .map(|(entity_type, entity_id)| EntitlementInput {
            entity_type,
            entity_id,
            status: EntitlementStatus::Active,
            source: "plano-teste".into(),
            metadata: None,
        })
        .collect();
    state
        .iam_service
        .set_entitlements_bulk(actor.id, restaurant_id, &inputs)
        .await
        .expect("entitlements");
    inputs
}

pub async fn feature_id(pool: &sqlx::PgPool, key: &str) -> Uuid {
    sqlx::query_scalar("SELECT id FROM features WHERE key = $1")
        .bind(key)
        .fetch_one(pool)
        .await
        .expect("feature")
}

pub async fn action_id(pool: &sqlx::PgPool, key: &str) -> i16 {
    sqlx::query_scalar("SELECT id FROM actions WHERE key = $1")
        .bind(key)
        .fetch_one(pool)
        .await
        .expect("action")
}

pub async fn perm_version(pool: &sqlx::PgPool, restaurant_id: Uuid) -> i32 {
    sqlx::query_scalar("SELECT perm_version FROM restaurants WHERE id = $1")
        .bind(restaurant_id)
        .fetch_one(pool)
        .await
        .expect("perm_version")
}

/// Requisição autenticada no contexto de um restaurante.
pub fn scoped_request(
    method: &str,
    uri: &str,
    token: &str,
    restaurant_id: Uuid,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("x-restaurant-id", restaurant_id.to_string());
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}
