//! Connection-pool settings.

use std::env;

/// Default local database used when `DATABASE_URL` is unset.
pub const DEFAULT_DATABASE_URL: &str = "postgres://postgres@localhost/smartsport";

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections kept open
    pub min_connections: u32,

    /// Seconds to wait for a free connection before failing
    pub connection_timeout_secs: u64,

    /// Seconds an idle connection may live
    pub idle_timeout_secs: u64,

    /// Seconds any connection may live
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    /// Read pool settings from the environment.
    ///
    /// - `DATABASE_URL` (default [`DEFAULT_DATABASE_URL`])
    /// - `DB_MAX_CONNECTIONS` (default 20)
    /// - `DB_MIN_CONNECTIONS` (default 2)
    /// - `DB_CONNECTION_TIMEOUT_SECS` (default 5)
    /// - `DB_IDLE_TIMEOUT_SECS` (default 300)
    /// - `DB_MAX_LIFETIME_SECS` (default 1800)
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::development();
        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: env_or("DB_MIN_CONNECTIONS", defaults.min_connections),
            connection_timeout_secs: env_or(
                "DB_CONNECTION_TIMEOUT_SECS",
                defaults.connection_timeout_secs,
            ),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", defaults.max_lifetime_secs),
        }
    }

    /// Local development defaults.
    pub fn development() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 20,
            min_connections: 2,
            connection_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        }
    }

    /// Replace the connection URL.
    pub fn with_url(mut self, database_url: impl Into<String>) -> Self {
        self.database_url = database_url.into();
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_url_keeps_pool_settings() {
        let config = DatabaseConfig::development().with_url("postgres://example/db");
        assert_eq!(config.database_url, "postgres://example/db");
        assert_eq!(config.max_connections, 20);
        assert!(config.min_connections <= config.max_connections);
    }
}
