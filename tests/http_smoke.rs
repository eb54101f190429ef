mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{app, json_request, read_json};
use tower::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn health_is_public() {
    let (app, _) = app();
    let response = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_route_without_token_is_unauthorized() {
    let (app, _) = app();
    let response = app
        .oneshot(Request::builder().uri("/api/users/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Token de autenticação inválido ou ausente.");
}

#[tokio::test]
async fn garbage_token_is_rejected_in_the_client_language() {
    let (app, _) = app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/restaurants")
                .header(header::AUTHORIZATION, "Bearer nao.e.um.jwt")
                .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Missing or invalid authentication token.");
}

#[tokio::test]
async fn restaurant_routes_require_the_restaurant_header() {
    let (app, state) = app();
    let token = state.auth_service.create_token(Uuid::new_v4()).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/iam/roles")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(
        body["error"],
        "O cabeçalho X-Restaurant-ID é obrigatório e deve ser um UUID."
    );
}

#[tokio::test]
async fn malformed_restaurant_header_is_a_bad_request() {
    let (app, state) = app();
    let token = state.auth_service.create_token(Uuid::new_v4()).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/menu/categories")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header("X-Restaurant-ID", "loja-do-centro")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn token_is_checked_before_the_restaurant_header() {
    let (app, _) = app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/iam/tree")
                .header("X-Restaurant-ID", Uuid::new_v4().to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_registration_returns_field_details() {
    let (app, _) = app();
    let request = json_request(
        "POST",
        "/api/auth/register",
        serde_json::json!({ "email": "sem-arroba", "password": "123" }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = read_json(response).await;
    assert_eq!(body["error"], "Um ou mais campos são inválidos.");
    assert_eq!(body["details"]["email"][0], "O e-mail fornecido é inválido.");
    assert!(body["details"]["password"].is_array());
}

#[tokio::test]
async fn superadmin_routes_also_require_a_token() {
    let (app, _) = app();
    let request = json_request(
        "POST",
        "/api/admin/entitlements/bulk",
        serde_json::json!({ "restaurantId": Uuid::new_v4(), "entitlements": [] }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
