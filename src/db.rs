use crate::config::AppConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{debug, info};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Connection pool settings derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl DbConfig {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(30),
            acquire_timeout: Duration::from_secs(8),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

/// Establishes a connection pool to the database.
pub async fn establish_connection(config: &DbConfig) -> Result<DbPool, DbErr> {
    debug!(max_connections = config.max_connections, "configuring database connection");

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    let pool = Database::connect(opt).await?;
    info!("database connection established");
    Ok(pool)
}

pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, DbErr> {
    establish_connection(&DbConfig::from_app_config(cfg)).await
}

/// Apply all pending migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), DbErr> {
    crate::migrator::Migrator::up(pool, None).await?;
    info!("migrations applied");
    Ok(())
}
