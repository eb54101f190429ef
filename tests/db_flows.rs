mod common;

use axum::http::StatusCode;
use common::{
    action_id, db_state, entitle_module, feature_id, new_restaurant, new_user, perm_version, read_json,
    scoped_request,
};
use restaurant_backend::{
    common::error::AppError,
    models::{customers::CustomerPayload, entitlement::EntitlementStatus, rbac::PermissionGrant},
    router::build_router,
};
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

async fn grant(pool: &PgPool, feature: &str, action: &str) -> PermissionGrant {
    PermissionGrant {
        feature_id: feature_id(pool, feature).await,
        action_id: action_id(pool, action).await,
        allowed: true,
    }
}

async fn system_role_id(pool: &PgPool, key: &str) -> Uuid {
    sqlx::query_scalar("SELECT id FROM roles WHERE key = $1 AND restaurant_id IS NULL")
        .bind(key)
        .fetch_one(pool)
        .await
        .unwrap()
}

// ---
// Cardápio pela API (dono com o módulo ERP liberado)
// ---

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_addon_name_is_a_conflict(pool: PgPool) {
    let state = db_state(pool.clone());
    let owner = new_user(&state, "dona@cantina.com").await;
    let rid = new_restaurant(&state, &owner, "Cantina").await;
    entitle_module(&state, &pool, &owner, rid, "erp").await;
    let token = state.auth_service.create_token(owner.id).unwrap();
    let app = build_router(state);

    let body = json!({ "name": "Bacon", "price": 4.5 });
    let first = app
        .clone()
        .oneshot(scoped_request("POST", "/api/menu/addons", &token, rid, Some(body.clone())))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    // Mesmo nome com espaços em volta ainda é o mesmo adicional
    let second = app
        .oneshot(scoped_request("POST", "/api/menu/addons", &token, rid, Some(json!({ "name": " Bacon ", "price": 5 }))))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let error = read_json(second).await;
    assert!(error["error"].as_str().unwrap().contains("Bacon"));
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_missing_category_is_not_found(pool: PgPool) {
    let state = db_state(pool.clone());
    let owner = new_user(&state, "dono@bistro.com").await;
    let rid = new_restaurant(&state, &owner, "Bistrô").await;
    entitle_module(&state, &pool, &owner, rid, "erp").await;
    let token = state.auth_service.create_token(owner.id).unwrap();

    let uri = format!("/api/menu/categories/{}", Uuid::new_v4());
    let response = build_router(state)
        .oneshot(scoped_request("DELETE", &uri, &token, rid, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn erp_routes_are_locked_until_entitled(pool: PgPool) {
    let state = db_state(pool.clone());
    let owner = new_user(&state, "dono@lanchonete.com").await;
    let rid = new_restaurant(&state, &owner, "Lanchonete").await;
    let token = state.auth_service.create_token(owner.id).unwrap();
    let app = build_router(state.clone());

    let locked = app
        .clone()
        .oneshot(scoped_request("GET", "/api/stock/items", &token, rid, None))
        .await
        .unwrap();
    assert_eq!(locked.status(), StatusCode::PAYMENT_REQUIRED);

    entitle_module(&state, &pool, &owner, rid, "erp").await;
    let open = app
        .oneshot(scoped_request("GET", "/api/stock/items", &token, rid, None))
        .await
        .unwrap();
    assert_eq!(open.status(), StatusCode::OK);
}

// ---
// IAM
// ---

#[sqlx::test(migrations = "./migrations")]
async fn role_grant_is_seen_by_the_next_check(pool: PgPool) {
    let state = db_state(pool.clone());
    let owner = new_user(&state, "dona@pizzaria.com").await;
    let waiter = new_user(&state, "garcom@pizzaria.com").await;
    let rid = new_restaurant(&state, &owner, "Pizzaria").await;
    entitle_module(&state, &pool, &owner, rid, "erp").await;

    let role = state.iam_service.create_role(owner.id, rid, "garcom", "Garçom").await.unwrap();
    state.iam_service.assign_user_role(owner.id, rid, waiter.id, role.id).await.unwrap();

    // Primeira checagem popula o cache
    let before = state
        .permission_service
        .check(&waiter, rid, "erp:menu:addons", "read")
        .await
        .unwrap();
    assert!(!before.allowed);
    let version_before = perm_version(&pool, rid).await;

    let grants = vec![grant(&pool, "erp:menu:addons", "read").await];
    state.iam_service.set_role_permissions(owner.id, rid, role.id, &grants).await.unwrap();

    assert!(perm_version(&pool, rid).await > version_before);
    let after = state
        .permission_service
        .check(&waiter, rid, "erp:menu:addons", "read")
        .await
        .unwrap();
    assert!(after.allowed);
}

#[sqlx::test(migrations = "./migrations")]
async fn superadmin_promotion_is_not_hidden_by_the_cache(pool: PgPool) {
    let state = db_state(pool.clone());
    let owner = new_user(&state, "dono@padaria.com").await;
    let staff = new_user(&state, "caixa@padaria.com").await;
    let rid = new_restaurant(&state, &owner, "Padaria").await;
    let role = state.iam_service.create_role(owner.id, rid, "caixa", "Caixa").await.unwrap();
    state.iam_service.assign_user_role(owner.id, rid, staff.id, role.id).await.unwrap();

    let denied = state
        .permission_service
        .check(&staff, rid, "erp:menu:categories", "delete")
        .await
        .unwrap();
    assert!(!denied.allowed);

    // Promoção direto no banco: perm_version do restaurante não muda
    sqlx::query("UPDATE users SET is_superadmin = TRUE WHERE id = $1")
        .bind(staff.id)
        .execute(&pool)
        .await
        .unwrap();
    let promoted = state.auth_service.load_user(staff.id).await.unwrap();

    let allowed = state
        .permission_service
        .check(&promoted, rid, "erp:menu:categories", "delete")
        .await
        .unwrap();
    assert!(allowed.allowed);
}

#[sqlx::test(migrations = "./migrations")]
async fn system_roles_cannot_be_edited(pool: PgPool) {
    let state = db_state(pool.clone());
    let owner = new_user(&state, "dono@sushi.com").await;
    let rid = new_restaurant(&state, &owner, "Sushi").await;
    let manager = system_role_id(&pool, "manager").await;

    let err = state
        .iam_service
        .update_role(owner.id, rid, manager, "Gerentão")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    let grants = vec![grant(&pool, "erp:menu:addons", "read").await];
    let err = state
        .iam_service
        .set_role_permissions(owner.id, rid, manager, &grants)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn another_restaurants_role_is_not_found(pool: PgPool) {
    let state = db_state(pool.clone());
    let alice = new_user(&state, "alice@a.com").await;
    let bruno = new_user(&state, "bruno@b.com").await;
    let rid_a = new_restaurant(&state, &alice, "Casa A").await;
    let rid_b = new_restaurant(&state, &bruno, "Casa B").await;
    let foreign = state.iam_service.create_role(bruno.id, rid_b, "chef", "Chef").await.unwrap();

    let err = state
        .iam_service
        .update_role(alice.id, rid_a, foreign.id, "Meu chef")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::RoleNotFound));
    assert_eq!(err.status(), StatusCode::NOT_FOUND);

    let err = state
        .iam_service
        .assign_user_role(alice.id, rid_a, alice.id, foreign.id)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn role_permissions_are_replaced_as_a_whole(pool: PgPool) {
    let state = db_state(pool.clone());
    let owner = new_user(&state, "dono@cafe.com").await;
    let rid = new_restaurant(&state, &owner, "Café").await;
    let role = state.iam_service.create_role(owner.id, rid, "barista", "Barista").await.unwrap();

    let first = vec![
        grant(&pool, "erp:menu:addons", "read").await,
        grant(&pool, "erp:menu:categories", "read").await,
    ];
    let views = state.iam_service.set_role_permissions(owner.id, rid, role.id, &first).await.unwrap();
    assert_eq!(views.len(), 2);

    let second = vec![grant(&pool, "erp:menu:categories", "create").await];
    let views = state.iam_service.set_role_permissions(owner.id, rid, role.id, &second).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].feature_key, "erp:menu:categories");
    assert_eq!(views[0].action_key, "create");

    // Funcionalidade inexistente: 400 e nada muda
    let read = action_id(&pool, "read").await;
    let broken = vec![
        grant(&pool, "erp:menu:addons", "read").await,
        PermissionGrant { feature_id: Uuid::new_v4(), action_id: read, allowed: true },
    ];
    let version_before = perm_version(&pool, rid).await;
    let err = state
        .iam_service
        .set_role_permissions(owner.id, rid, role.id, &broken)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let views = state.iam_service.get_role_permissions(rid, role.id).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].action_key, "create");
    assert_eq!(perm_version(&pool, rid).await, version_before);
}

#[sqlx::test(migrations = "./migrations")]
async fn bulk_entitlements_count_created_and_updated(pool: PgPool) {
    let state = db_state(pool.clone());
    let owner = new_user(&state, "dono@churrascaria.com").await;
    let rid = new_restaurant(&state, &owner, "Churrascaria").await;

    let mut inputs = entitle_module(&state, &pool, &owner, rid, "fidelity").await;
    assert!(!inputs.is_empty());

    // Reaplicar igual não conta nada
    let again = state.iam_service.set_entitlements_bulk(owner.id, rid, &inputs).await.unwrap();
    assert_eq!((again.created_count, again.updated_count), (0, 0));

    // Um bloqueado + o módulo ERP inteiro novo
    inputs.truncate(1);
    inputs[0].status = EntitlementStatus::Locked;
    let erp_nodes = restaurant_backend::db::CatalogRepository::new(pool.clone())
        .module_subtree(&pool, "erp")
        .await
        .unwrap();
    let erp_count = erp_nodes.len();
    inputs.extend(erp_nodes.into_iter().map(|(entity_type, entity_id)| {
        restaurant_backend::models::entitlement::EntitlementInput {
            entity_type,
            entity_id,
            status: EntitlementStatus::Trial,
            source: "teste-gratis".into(),
            metadata: Some(json!({ "dias": 14 })),
        }
    }));

    let version_before = perm_version(&pool, rid).await;
    let result = state.iam_service.set_entitlements_bulk(owner.id, rid, &inputs).await.unwrap();
    assert_eq!(result.created_count, erp_count);
    assert_eq!(result.updated_count, 1);
    assert!(perm_version(&pool, rid).await > version_before);

    let body = serde_json::to_value(&result).unwrap();
    assert_eq!(body["createdCount"], erp_count);
    assert_eq!(body["updatedCount"], 1);
}

// ---
// ERP
// ---

#[sqlx::test(migrations = "./migrations")]
async fn stock_exit_never_goes_below_zero(pool: PgPool) {
    let state = db_state(pool.clone());
    let owner = new_user(&state, "dono@hamburgueria.com").await;
    let rid = new_restaurant(&state, &owner, "Hamburgueria").await;
    entitle_module(&state, &pool, &owner, rid, "erp").await;
    let token = state.auth_service.create_token(owner.id).unwrap();
    let app = build_router(state.clone());

    let created = app
        .clone()
        .oneshot(scoped_request(
            "POST",
            "/api/stock/items",
            &token,
            rid,
            Some(json!({ "kind": "ingredient", "name": "Pão brioche", "unitOfMeasure": "un", "minStockLevel": 5 })),
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let item_id = read_json(created).await["id"].as_str().unwrap().to_string();

    let entry = app
        .clone()
        .oneshot(scoped_request(
            "POST",
            "/api/stock/movements",
            &token,
            rid,
            Some(json!({ "itemId": item_id, "movementType": "entry", "reason": "PURCHASE", "quantity": 10, "unitCost": 1.2 })),
        ))
        .await
        .unwrap();
    assert_eq!(entry.status(), StatusCode::CREATED);
    assert_eq!(read_json(entry).await["stockAfter"], 10.0);

    let too_much = app
        .clone()
        .oneshot(scoped_request(
            "POST",
            "/api/stock/movements",
            &token,
            rid,
            Some(json!({ "itemId": item_id, "movementType": "exit", "reason": "SALE", "quantity": 11 })),
        ))
        .await
        .unwrap();
    assert_eq!(too_much.status(), StatusCode::BAD_REQUEST);

    let item = app
        .clone()
        .oneshot(scoped_request("GET", &format!("/api/stock/items/{}", item_id), &token, rid, None))
        .await
        .unwrap();
    let item = read_json(item).await;
    assert_eq!(item["currentStock"], 10.0);
    assert_eq!(item["averageCost"], 1.2);

    let missing = app
        .oneshot(scoped_request(
            "POST",
            "/api/stock/movements",
            &token,
            rid,
            Some(json!({ "itemId": Uuid::new_v4(), "movementType": "entry", "reason": "PURCHASE", "quantity": 1 })),
        ))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn cash_flow_and_goal_progress_follow_transactions(pool: PgPool) {
    let state = db_state(pool.clone());
    let owner = new_user(&state, "dona@restaurante.com").await;
    let rid = new_restaurant(&state, &owner, "Restaurante").await;
    entitle_module(&state, &pool, &owner, rid, "erp").await;
    let token = state.auth_service.create_token(owner.id).unwrap();
    let app = build_router(state.clone());
    let today = chrono::Utc::now().date_naive();

    for (kind, amount) in [("income", 80), ("income", 40), ("expense", 30)] {
        let response = app
            .clone()
            .oneshot(scoped_request(
                "POST",
                "/api/financial/transactions",
                &token,
                rid,
                Some(json!({ "kind": kind, "amount": amount, "description": "Movimento do dia", "transactionDate": today })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let uri = format!("/api/financial/cash-flow?startDate={}&endDate={}", today, today);
    let report = read_json(app.clone().oneshot(scoped_request("GET", &uri, &token, rid, None)).await.unwrap()).await;
    assert_eq!(report["totalIncome"], 120.0);
    assert_eq!(report["netCashFlow"], 90.0);

    let goal = app
        .clone()
        .oneshot(scoped_request(
            "POST",
            "/api/goals",
            &token,
            rid,
            Some(json!({
                "name": "Faturamento da semana",
                "metric": "revenue",
                "targetValue": 100,
                "startDate": today,
                "endDate": today + chrono::Duration::days(6)
            })),
        ))
        .await
        .unwrap();
    assert_eq!(goal.status(), StatusCode::CREATED);
    let goal_id = read_json(goal).await["id"].as_str().unwrap().to_string();

    let refreshed = app
        .oneshot(scoped_request("POST", &format!("/api/goals/{}/progress", goal_id), &token, rid, None))
        .await
        .unwrap();
    let refreshed = read_json(refreshed).await;
    assert_eq!(refreshed["currentValue"], 120.0);
    assert_eq!(refreshed["status"], "achieved");
}

#[sqlx::test(migrations = "./migrations")]
async fn transaction_category_must_match_and_be_visible(pool: PgPool) {
    let state = db_state(pool.clone());
    let owner = new_user(&state, "dono@tasca.com").await;
    let rid = new_restaurant(&state, &owner, "Tasca").await;
    let other_owner = new_user(&state, "dono@vizinho.com").await;
    let other_rid = new_restaurant(&state, &other_owner, "Vizinho").await;

    let rent: Uuid = sqlx::query_scalar("SELECT id FROM financial_categories WHERE name = 'Aluguel' AND restaurant_id IS NULL")
        .fetch_one(&pool)
        .await
        .unwrap();

    let payload = |kind: &str, category_id: Uuid| {
        serde_json::from_value::<restaurant_backend::models::finance::FinancialTransactionPayload>(json!({
            "kind": kind,
            "amount": 1500,
            "description": "Aluguel de março",
            "categoryId": category_id,
            "transactionDate": "2025-03-05"
        }))
        .unwrap()
    };

    let err = state
        .finance_service
        .create_transaction(rid, owner.id, &payload("income", rent))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let private = state
        .finance_service
        .create_category(
            other_rid,
            other_owner.id,
            &serde_json::from_value(json!({ "name": "Manutenção", "kind": "expense" })).unwrap(),
        )
        .await
        .unwrap();
    let err = state
        .finance_service
        .create_transaction(rid, owner.id, &payload("expense", private.id))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);

    let ok = state
        .finance_service
        .create_transaction(rid, owner.id, &payload("expense", rent))
        .await
        .unwrap();
    assert_eq!(ok.category_name.as_deref(), Some("Aluguel"));
}

#[sqlx::test(migrations = "./migrations")]
async fn segmentation_assigns_by_priority(pool: PgPool) {
    let state = db_state(pool.clone());
    let owner = new_user(&state, "dono@trattoria.com").await;
    let rid = new_restaurant(&state, &owner, "Trattoria").await;
    let customers = &state.customer_service;

    let vip = customers
        .create_segment(
            rid,
            owner.id,
            &serde_json::from_value(json!({ "name": "VIP", "priority": 10, "rules": { "minTotalSpent": 500 } })).unwrap(),
        )
        .await
        .unwrap();
    let regular = customers
        .create_segment(
            rid,
            owner.id,
            &serde_json::from_value(json!({ "name": "Frequente", "priority": 1, "rules": { "minVisits": 2 } })).unwrap(),
        )
        .await
        .unwrap();

    let new_customer = |name: &str| -> CustomerPayload { serde_json::from_value(json!({ "name": name })).unwrap() };
    let big = customers.create_customer(rid, owner.id, &new_customer("Helena")).await.unwrap();
    let usual = customers.create_customer(rid, owner.id, &new_customer("Otávio")).await.unwrap();
    customers.create_customer(rid, owner.id, &new_customer("Novato")).await.unwrap();

    customers.record_visit(rid, owner.id, big.id, "600".parse().unwrap()).await.unwrap();
    customers.record_visit(rid, owner.id, big.id, "50".parse().unwrap()).await.unwrap();
    customers.record_visit(rid, owner.id, usual.id, "30".parse().unwrap()).await.unwrap();
    customers.record_visit(rid, owner.id, usual.id, "30".parse().unwrap()).await.unwrap();

    let result = customers.apply_segmentation(rid, owner.id).await.unwrap();
    assert_eq!(result.processed_count, 3);
    assert_eq!(result.assigned_count, 2);
    assert_eq!(result.changed_count, 2);

    assert_eq!(customers.get_customer(rid, owner.id, big.id).await.unwrap().segment_id, Some(vip.id));
    assert_eq!(customers.get_customer(rid, owner.id, usual.id).await.unwrap().segment_id, Some(regular.id));

    // Rodar de novo não muda ninguém
    let again = customers.apply_segmentation(rid, owner.id).await.unwrap();
    assert_eq!(again.changed_count, 0);

    let err = customers
        .create_segment(
            rid,
            owner.id,
            &serde_json::from_value(json!({ "name": "VIP", "rules": { "minVisits": 1 } })).unwrap(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);
}
