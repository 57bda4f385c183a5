/**
 * Server Configuration
 *
 * This module loads the server configuration from environment variables
 * (after `.env` has been applied by the binary) and builds the message store
 * the configuration points at.
 *
 * # Configuration Sources
 *
 * | Variable | Default |
 * |---|---|
 * | `HTTP_PORT` | `8080` |
 * | `DATABASE_URL` | built from `DB_*` when `DB_HOST` is set, else none |
 * | `AUTH_SERVICE_URL` | `http://localhost:8081` |
 * | `SHUTDOWN_TIMEOUT_SECONDS` | `5` |
 * | `VERIFY_TIMEOUT_SECONDS` | `5` |
 * | `STORE_TIMEOUT_SECONDS` | `5` |
 * | `WRITE_TIMEOUT_SECONDS` | `10` |
 * | `ALLOWED_ORIGINS` | local frontend and sibling services |
 * | `CHAT_REJECT_ANONYMOUS` | `false` |
 * | `HISTORY_ORDER` | `asc` |
 *
 * # Error Handling
 *
 * Malformed values are startup errors. A database that cannot be reached is
 * not: the failure is logged and the server falls back to the in-memory
 * store so chat keeps working.
 */

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use crate::backend::chat::db::PgMessageStore;
use crate::backend::chat::store::{HistoryOrder, InMemoryMessageStore, MessageStore};

const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:8080",
    "http://localhost:8081",
    "http://localhost:8082",
    "http://localhost:8083",
];

/// Configuration errors raised at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime configuration of the chat server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the HTTP listener binds on all interfaces
    pub http_port: u16,
    /// Postgres DSN; `None` selects the in-memory store
    pub database_url: Option<String>,
    /// Base URL of the account service used for identity checks
    pub auth_service_url: String,
    pub shutdown_timeout: Duration,
    pub verify_timeout: Duration,
    pub store_timeout: Duration,
    /// Longest a single frame write may take before the peer is dropped
    pub write_timeout: Duration,
    /// Origins accepted by CORS and by the WebSocket upgrade
    pub allowed_origins: Vec<String>,
    /// Refuse unauthenticated upgrades with 401 instead of degrading
    pub reject_anonymous: bool,
    pub history_order: HistoryOrder,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            database_url: None,
            auth_service_url: "http://localhost:8081".to_string(),
            shutdown_timeout: Duration::from_secs(5),
            verify_timeout: Duration::from_secs(5),
            store_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(10),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
            reject_anonymous: false,
            history_order: HistoryOrder::Ascending,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// # Arguments
    ///
    /// * `lookup` - Returns the raw value for a variable name, if set
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let http_port = match get("HTTP_PORT") {
            Some(raw) => parse(&raw, "HTTP_PORT")?,
            None => defaults.http_port,
        };

        let database_url = get("DATABASE_URL").or_else(|| {
            get("DB_HOST").map(|host| {
                format!(
                    "postgres://{}:{}@{}:{}/{}?sslmode={}",
                    get("DB_USER").unwrap_or_else(|| "postgres".to_string()),
                    get("DB_PASSWORD").unwrap_or_else(|| "postgres".to_string()),
                    host,
                    get("DB_PORT").unwrap_or_else(|| "5432".to_string()),
                    get("DB_NAME").unwrap_or_else(|| "chat".to_string()),
                    get("DB_SSLMODE").unwrap_or_else(|| "disable".to_string()),
                )
            })
        });

        let allowed_origins = match get("ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|o| o.trim().trim_end_matches('/').to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            None => defaults.allowed_origins,
        };

        let reject_anonymous = match get("CHAT_REJECT_ANONYMOUS") {
            Some(raw) => parse_bool(&raw, "CHAT_REJECT_ANONYMOUS")?,
            None => defaults.reject_anonymous,
        };

        let history_order = match get("HISTORY_ORDER") {
            Some(raw) => raw.parse::<HistoryOrder>().map_err(|reason| ConfigError::Invalid {
                key: "HISTORY_ORDER",
                value: raw.clone(),
                reason,
            })?,
            None => defaults.history_order,
        };

        Ok(Self {
            http_port,
            database_url,
            auth_service_url: get("AUTH_SERVICE_URL").unwrap_or(defaults.auth_service_url),
            shutdown_timeout: seconds(get("SHUTDOWN_TIMEOUT_SECONDS"), "SHUTDOWN_TIMEOUT_SECONDS", defaults.shutdown_timeout)?,
            verify_timeout: seconds(get("VERIFY_TIMEOUT_SECONDS"), "VERIFY_TIMEOUT_SECONDS", defaults.verify_timeout)?,
            store_timeout: seconds(get("STORE_TIMEOUT_SECONDS"), "STORE_TIMEOUT_SECONDS", defaults.store_timeout)?,
            write_timeout: seconds(get("WRITE_TIMEOUT_SECONDS"), "WRITE_TIMEOUT_SECONDS", defaults.write_timeout)?,
            allowed_origins,
            reject_anonymous,
            history_order,
        })
    }
}

fn parse<T>(raw: &str, key: &'static str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(raw: &str, key: &'static str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

fn seconds(raw: Option<String>, key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match raw {
        Some(raw) => {
            let secs: u64 = parse(&raw, key)?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    value: raw,
                    reason: "must be at least one second".to_string(),
                });
            }
            Ok(Duration::from_secs(secs))
        }
        None => Ok(default),
    }
}

/// Build the message store selected by the configuration
///
/// # Returns
///
/// - `PgMessageStore` if a database URL is configured and reachable
/// - `InMemoryMessageStore` otherwise
///
/// # Errors
///
/// Connection failures are logged and do not prevent startup.
pub async fn load_store(config: &ServerConfig) -> Arc<dyn MessageStore> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set. Messages are kept in memory only.");
        return Arc::new(InMemoryMessageStore::new());
    };

    tracing::info!("Connecting to database...");

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(config.store_timeout)
        .connect(database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to create database connection pool: {:?}", e);
            tracing::warn!("Falling back to the in-memory message store.");
            return Arc::new(InMemoryMessageStore::new());
        }
    };

    tracing::info!("Database connection pool created successfully");

    let store = PgMessageStore::new(pool);
    match store.messages_table_exists().await {
        Ok(true) => {}
        Ok(false) => tracing::warn!("Table 'messages' does not exist yet; posts will fail until it is created"),
        Err(e) => tracing::warn!("Could not check for the 'messages' table: {}", e),
    }

    Arc::new(store)
}
