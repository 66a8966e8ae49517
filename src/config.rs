use std::fmt;

use crate::error::ConfigError;

pub const DEFAULT_DATABASE: &str = "rates";
pub const DEFAULT_COLLECTION: &str = "exchange_rate";

/// Connection settings for the document store.
///
/// Built once at startup and handed to the store explicitly; the store never
/// reads the environment itself.
#[derive(Clone)]
pub struct StoreConfig {
    pub username: String,
    pub password: String,
    /// Connection descriptor, a `mongodb://` or `mongodb+srv://` URI.
    pub dsn: String,
    pub database: String,
    pub collection: String,
    /// Overrides the descriptor's `authSource` when set.
    pub auth_source: Option<String>,
    /// Run inserts inside a session transaction committed by `commit()`.
    pub transactions: bool,
}

impl StoreConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let optional = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let username = required("DB_USER")?;
        let password = required("DB_PASS")?;
        let dsn = required("DB_URL_PODMAN")?;

        let transactions = match lookup("DB_TRANSACTIONS") {
            Some(value) => parse_flag(&value).ok_or(ConfigError::Invalid {
                var: "DB_TRANSACTIONS",
                value,
            })?,
            None => false,
        };

        Ok(Self {
            username,
            password,
            dsn,
            database: optional("DB_NAME", DEFAULT_DATABASE),
            collection: optional("DB_COLLECTION", DEFAULT_COLLECTION),
            auth_source: lookup("DB_AUTH_SOURCE").filter(|v| !v.trim().is_empty()),
            transactions,
        })
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .field("dsn", &self.dsn)
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("auth_source", &self.auth_source)
            .field("transactions", &self.transactions)
            .finish()
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
