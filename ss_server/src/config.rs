//! Server configuration.
//!
//! Every environment variable the server reads is read here, once, at
//! startup. Pool settings come from [`DatabaseConfig::from_env`].

use smartsport::db::DatabaseConfig;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_BIND: ([u8; 4], u16) = ([127, 0, 0, 1], 8000);

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP bind address
    pub bind: SocketAddr,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
    /// Prometheus exporter address; no exporter when unset
    pub metrics_bind: Option<SocketAddr>,
}

/// Token signing and password hashing secrets
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// JWT signing secret (required)
    pub jwt_secret: String,
    /// Password hashing pepper (required)
    pub password_pepper: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
}

/// Budget for `/auth/login` and `/auth/register`, per client address
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub auth_requests: usize,
    pub auth_window_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.auth_window_secs)
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Command-line overrides win over `SERVER_BIND` and `DATABASE_URL`.
    ///
    /// # Errors
    ///
    /// `JWT_SECRET` or `PASSWORD_PEPPER` missing, or `METRICS_BIND` not an
    /// address.
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = bind_override
            .or_else(|| {
                std::env::var("SERVER_BIND")
                    .ok()
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or_else(|| SocketAddr::from(DEFAULT_BIND));

        let mut database = DatabaseConfig::from_env();
        if let Some(url) = database_url_override {
            database = database.with_url(url);
        }

        let jwt_secret = required("JWT_SECRET", "Generate with: openssl rand -hex 32")?;
        let password_pepper = required("PASSWORD_PEPPER", "Generate with: openssl rand -hex 16")?;

        let security = SecurityConfig {
            jwt_secret,
            password_pepper,
            access_token_minutes: parse_env_or("ACCESS_TOKEN_MINUTES", 15),
            refresh_token_days: parse_env_or("REFRESH_TOKEN_DAYS", 7),
        };

        let rate_limit = RateLimitConfig {
            auth_requests: parse_env_or("RATE_LIMIT_AUTH_REQUESTS", 10),
            auth_window_secs: parse_env_or("RATE_LIMIT_AUTH_WINDOW_SECS", 60),
        };

        let metrics_bind = match std::env::var("METRICS_BIND") {
            Ok(raw) if !raw.trim().is_empty() => {
                Some(raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    var: "METRICS_BIND".to_string(),
                    reason: format!("'{raw}' is not a socket address"),
                })?)
            }
            _ => None,
        };

        Ok(ServerConfig {
            bind,
            database,
            security,
            rate_limit,
            metrics_bind,
        })
    }

    /// Reject weak secrets and values that would disable a feature by accident.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: "Must be at least 32 characters".to_string(),
            });
        }

        if self.security.password_pepper.len() < 16 {
            return Err(ConfigError::Invalid {
                var: "PASSWORD_PEPPER".to_string(),
                reason: "Must be at least 16 characters".to_string(),
            });
        }

        if self.security.access_token_minutes <= 0 {
            return Err(ConfigError::Invalid {
                var: "ACCESS_TOKEN_MINUTES".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.security.refresh_token_days <= 0 {
            return Err(ConfigError::Invalid {
                var: "REFRESH_TOKEN_DAYS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.rate_limit.auth_requests == 0 {
            return Err(ConfigError::Invalid {
                var: "RATE_LIMIT_AUTH_REQUESTS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.rate_limit.auth_window_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "RATE_LIMIT_AUTH_WINDOW_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed DB_MAX_CONNECTIONS ({})",
                    self.database.max_connections
                ),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn required(var: &str, hint: &str) -> Result<String, ConfigError> {
    std::env::var(var).map_err(|_| ConfigError::MissingRequired {
        var: var.to_string(),
        hint: hint.to_string(),
    })
}

/// Parse an environment variable, falling back to `default` when unset or invalid
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
