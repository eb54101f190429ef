// src/router.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{
    config::AppState,
    handlers,
    middleware::auth::{auth_guard, restaurant_guard},
};

pub fn build_router(app_state: AppState) -> Router {
    // Rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Rotas que só precisam do token
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let restaurant_routes = Router::new()
        .route(
            "/",
            post(handlers::restaurants::create_restaurant)
                .get(handlers::restaurants::list_my_restaurants),
        )
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let catalog_routes = Router::new()
        .route("/features", get(handlers::iam::list_features))
        .route("/actions", get(handlers::iam::list_actions))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Entitlements: só superadmin, o restaurante vem no corpo
    let admin_routes = Router::new()
        .route(
            "/entitlements",
            post(handlers::iam::set_entitlement).delete(handlers::iam::remove_entitlement),
        )
        .route("/entitlements/bulk", post(handlers::iam::set_entitlements_bulk))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Daqui pra baixo tudo exige X-Restaurant-ID e vínculo com o restaurante
    let members_routes = Router::new()
        .route("/members", get(handlers::restaurants::list_members))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), restaurant_guard));

    let iam_routes = Router::new()
        .route("/tree", get(handlers::iam::get_permission_tree))
        .route("/check", post(handlers::iam::check_permission))
        .route("/roles", get(handlers::iam::list_roles).post(handlers::iam::create_role))
        .route(
            "/roles/{id}",
            patch(handlers::iam::update_role).delete(handlers::iam::delete_role),
        )
        .route(
            "/roles/{id}/permissions",
            get(handlers::iam::get_role_permissions).post(handlers::iam::set_role_permissions),
        )
        .route(
            "/users/{id}/roles",
            get(handlers::iam::list_user_roles).post(handlers::iam::assign_user_role),
        )
        .route(
            "/users/{id}/roles/{role_id}",
            axum::routing::delete(handlers::iam::remove_user_role),
        )
        .route(
            "/users/{id}/overrides",
            get(handlers::iam::get_user_overrides).post(handlers::iam::set_user_overrides),
        )
        .route(
            "/users/{id}/overrides/{feature_id}/{action_id}",
            axum::routing::delete(handlers::iam::delete_user_override),
        )
        .route("/entitlements", get(handlers::iam::list_entitlements))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), restaurant_guard));

    let menu_routes = Router::new()
        .route(
            "/categories",
            get(handlers::menu::list_categories).post(handlers::menu::create_category),
        )
        .route(
            "/categories/{id}",
            get(handlers::menu::get_category)
                .put(handlers::menu::update_category)
                .delete(handlers::menu::delete_category),
        )
        .route("/categories/{id}/status", patch(handlers::menu::set_category_status))
        .route(
            "/addons",
            get(handlers::menu::list_addons).post(handlers::menu::create_addon),
        )
        .route(
            "/addons/{id}",
            get(handlers::menu::get_addon)
                .put(handlers::menu::update_addon)
                .delete(handlers::menu::delete_addon),
        )
        .route("/addons/{id}/status", patch(handlers::menu::set_addon_status))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), restaurant_guard));

    let stock_routes = Router::new()
        .route("/items", get(handlers::stock::list_items).post(handlers::stock::create_item))
        .route(
            "/items/{id}",
            get(handlers::stock::get_item)
                .put(handlers::stock::update_item)
                .delete(handlers::stock::delete_item),
        )
        .route("/items/{id}/movements", get(handlers::stock::item_movements))
        .route("/movements", post(handlers::stock::create_movement))
        .route("/dashboard", get(handlers::stock::dashboard))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), restaurant_guard));

    let financial_routes = Router::new()
        .route(
            "/categories",
            get(handlers::finance::list_categories).post(handlers::finance::create_category),
        )
        .route(
            "/transactions",
            get(handlers::finance::list_transactions).post(handlers::finance::create_transaction),
        )
        .route(
            "/transactions/{id}",
            get(handlers::finance::get_transaction).delete(handlers::finance::delete_transaction),
        )
        .route("/cash-flow", get(handlers::finance::cash_flow))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), restaurant_guard));

    let goal_routes = Router::new()
        .route("/", get(handlers::goals::list_goals).post(handlers::goals::create_goal))
        .route(
            "/{id}",
            get(handlers::goals::get_goal)
                .put(handlers::goals::update_goal)
                .delete(handlers::goals::delete_goal),
        )
        .route("/{id}/progress", post(handlers::goals::refresh_progress))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), restaurant_guard));

    let customer_routes = Router::new()
        .route(
            "/",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route("/{id}", get(handlers::customers::get_customer))
        .route("/{id}/visits", post(handlers::customers::record_visit))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), restaurant_guard));

    let segment_routes = Router::new()
        .route(
            "/",
            get(handlers::customers::list_segments).post(handlers::customers::create_segment),
        )
        .route("/apply", post(handlers::customers::apply_segmentation))
        .route(
            "/{id}",
            get(handlers::customers::get_segment)
                .put(handlers::customers::update_segment)
                .delete(handlers::customers::delete_segment),
        )
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), restaurant_guard));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/restaurants", restaurant_routes.merge(members_routes))
        .nest("/api/iam", catalog_routes.merge(iam_routes))
        .nest("/api/admin", admin_routes)
        .nest("/api/menu", menu_routes)
        .nest("/api/stock", stock_routes)
        .nest("/api/financial", financial_routes)
        .nest("/api/goals", goal_routes)
        .nest("/api/customers", customer_routes)
        .nest("/api/segments", segment_routes)
        .with_state(app_state)
}
