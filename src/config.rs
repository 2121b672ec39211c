use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;
use validator::Validate;

const DEFAULT_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 15;

/// Application configuration, layered from `config/default.toml`, an
/// environment-specific file and `UNIFLOW__`-prefixed environment variables.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// HTTP bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Deployment environment: "development", "test", "production"
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Log level filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,

    /// Run migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// Bounded timeout for every outbound carrier API call, in seconds.
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Key used to verify sealed provider credential bundles.
    #[validate(length(min = 32))]
    pub credential_key: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_provider_timeout_secs() -> u64 {
    DEFAULT_PROVIDER_TIMEOUT_SECS
}

impl AppConfig {
    /// Construct a configuration directly, used by tests and tooling.
    pub fn new(database_url: String, credential_key: String, environment: String) -> Self {
        Self {
            database_url,
            host: default_host(),
            port: default_port(),
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            provider_timeout_secs: default_provider_timeout_secs(),
            credential_key,
        }
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Load configuration from files and environment.
///
/// Later layers override earlier ones: default file, per-environment file,
/// then `UNIFLOW__` env vars (e.g. `UNIFLOW__DATABASE_URL`).
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let run_env = std::env::var("RUN_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder();

    let default_path = Path::new(CONFIG_DIR).join("default.toml");
    if default_path.exists() {
        builder = builder.add_source(File::from(default_path));
    }
    let env_path = Path::new(CONFIG_DIR).join(format!("{run_env}.toml"));
    if env_path.exists() {
        builder = builder.add_source(File::from(env_path));
    }

    let cfg: AppConfig = builder
        .add_source(Environment::with_prefix("UNIFLOW").separator("__"))
        .build()?
        .try_deserialize()?;

    cfg.validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {e}")))?;

    info!(environment = %cfg.environment, "configuration loaded");
    Ok(cfg)
}

/// Install the global tracing subscriber.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
