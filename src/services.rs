pub mod auth;
pub mod customer_service;
pub mod finance_service;
pub mod goal_service;
pub mod iam_service;
pub mod menu_service;
pub mod permission_service;
pub mod resolver;
pub mod restaurant_service;
pub mod snapshot_cache;
pub mod stock_service;
