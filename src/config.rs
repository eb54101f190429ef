// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        AuditRepository, CatalogRepository, CustomerRepository, EntitlementRepository, FinanceRepository,
        GoalRepository, MenuRepository, RbacRepository, RestaurantRepository, StockRepository, UserRepository,
    },
    services::{
        auth::AuthService, customer_service::CustomerService, finance_service::FinanceService,
        goal_service::GoalService, iam_service::IamService, menu_service::MenuService,
        permission_service::PermissionService, restaurant_service::RestaurantService,
        snapshot_cache::SnapshotCache, stock_service::StockService,
    },
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 3;
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

// Configuração lida do ambiente (.env incluso)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub permission_cache_ttl: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse::<u32>().context("DB_MAX_CONNECTIONS inválido")?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        let acquire_secs = match lookup("DB_ACQUIRE_TIMEOUT_SECS") {
            Some(v) => v.parse::<u64>().context("DB_ACQUIRE_TIMEOUT_SECS inválido")?,
            None => DEFAULT_ACQUIRE_TIMEOUT_SECS,
        };
        let ttl_secs = match lookup("PERMISSION_CACHE_TTL_SECS") {
            Some(v) => v.parse::<u64>().context("PERMISSION_CACHE_TTL_SECS inválido")?,
            None => DEFAULT_CACHE_TTL_SECS,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr,
            db_max_connections,
            db_acquire_timeout: Duration::from_secs(acquire_secs),
            permission_cache_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub restaurant_service: RestaurantService,
    pub permission_service: PermissionService,
    pub iam_service: IamService,
    pub menu_service: MenuService,
    pub stock_service: StockService,
    pub finance_service: FinanceService,
    pub goal_service: GoalService,
    pub customer_service: CustomerService,
}

impl AppState {
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
        Ok(Self::from_pool(db_pool, config))
    }

    /// Monta o gráfico de dependências sobre uma pool já criada.
    pub fn from_pool(db_pool: PgPool, config: &Config) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let restaurant_repo = RestaurantRepository::new(db_pool.clone());
        let catalog_repo = CatalogRepository::new(db_pool.clone());
        let entitlement_repo = EntitlementRepository::new(db_pool.clone());
        let rbac_repo = RbacRepository::new(db_pool.clone());
        let audit_repo = AuditRepository::new();

        let cache = Arc::new(SnapshotCache::new(config.permission_cache_ttl));
        let permission_service = PermissionService::new(
            restaurant_repo.clone(),
            catalog_repo.clone(),
            entitlement_repo.clone(),
            rbac_repo.clone(),
            cache,
        );

        let auth_service = AuthService::new(user_repo.clone(), config.jwt_secret.clone(), db_pool.clone());
        let restaurant_service = RestaurantService::new(
            db_pool.clone(),
            restaurant_repo.clone(),
            catalog_repo.clone(),
            entitlement_repo.clone(),
            audit_repo.clone(),
        );
        let iam_service = IamService::new(
            db_pool.clone(),
            user_repo,
            restaurant_repo,
            catalog_repo,
            entitlement_repo,
            rbac_repo,
            audit_repo.clone(),
            permission_service.clone(),
        );
        let menu_service = MenuService::new(db_pool.clone(), MenuRepository::new(), audit_repo.clone());
        let stock_service = StockService::new(db_pool.clone(), StockRepository::new(), audit_repo.clone());
        let finance_service = FinanceService::new(db_pool.clone(), FinanceRepository::new(), audit_repo.clone());
        let goal_service = GoalService::new(db_pool.clone(), GoalRepository::new(), audit_repo.clone());
        let customer_service = CustomerService::new(db_pool.clone(), CustomerRepository::new(), audit_repo);

        Self {
            db_pool,
            auth_service,
            restaurant_service,
            permission_service,
            iam_service,
            menu_service,
            stock_service,
            finance_service,
            goal_service,
            customer_service,
        }
    }
}
