pub mod user_repo;
pub use user_repo::UserRepository;
pub mod restaurant_repo;
pub use restaurant_repo::RestaurantRepository;
pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod entitlement_repo;
pub use entitlement_repo::EntitlementRepository;
pub mod rbac_repo;
pub use rbac_repo::RbacRepository;
pub mod audit_repo;
pub use audit_repo::AuditRepository;
pub mod menu_repo;
pub use menu_repo::MenuRepository;
pub mod stock_repo;
pub use stock_repo::StockRepository;
pub mod finance_repo;
pub use finance_repo::FinanceRepository;
pub mod goal_repo;
pub use goal_repo::GoalRepository;
pub mod customer_repo;
pub use customer_repo::CustomerRepository;
