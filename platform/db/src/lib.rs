//! Database primitives shared by the server and the integration tests.

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use thiserror::Error;
use tracing::info;

/// Shared connection pool alias.
pub type DbPool = DatabaseConnection;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing (set {0})")]
    MissingUrl(String),
    #[error("invalid value for {key}: {value}")]
    InvalidSetting { key: &'static str, value: String },
    #[error(transparent)]
    Connect(#[from] DbErr),
}

pub type DbResult<T> = Result<T, DbError>;

const DEFAULT_URL_KEY: &str = "DATABASE_URL";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Environment-driven connection settings.
#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    url_key: String,
    url: Option<String>,
    pub max_connections: u32,
    pub log_sql: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url_key: DEFAULT_URL_KEY.to_string(),
            url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            log_sql: false,
        }
    }
}

impl DatabaseSettings {
    /// Settings pointing at an explicit url, bypassing the environment.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup so callers can inject values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DbResult<Self> {
        let mut settings = Self {
            url: lookup(DEFAULT_URL_KEY).filter(|url| !url.trim().is_empty()),
            ..Self::default()
        };
        if let Some(raw) = lookup("DATABASE_MAX_CONNECTIONS") {
            settings.max_connections = raw.trim().parse().map_err(|_| DbError::InvalidSetting {
                key: "DATABASE_MAX_CONNECTIONS",
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup("DATABASE_LOG_SQL") {
            settings.log_sql = matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(settings)
    }

    pub fn database_url(&self) -> DbResult<&str> {
        self.url
            .as_deref()
            .ok_or_else(|| DbError::MissingUrl(self.url_key.clone()))
    }
}

/// Opens a pool according to `settings`.
pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let url = settings.database_url()?;
    // Every connection to an in-memory SQLite url opens a fresh database.
    let max_connections = if url.starts_with("sqlite::memory:") {
        1
    } else {
        settings.max_connections
    };
    let mut options = ConnectOptions::new(url.to_string());
    options
        .max_connections(max_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(settings.log_sql);
    let pool = Database::connect(options).await?;
    info!(
        backend = ?pool.get_database_backend(),
        max_connections,
        "database pool ready"
    );
    Ok(pool)
}

/// Round-trips a trivial statement to confirm the store is reachable.
pub async fn ping(pool: &DbPool) -> DbResult<()> {
    let backend = pool.get_database_backend();
    pool.execute(Statement::from_string(backend, "SELECT 1".to_string()))
        .await?;
    Ok(())
}
