//! Server configuration.

use std::env;

/// Fallback JWT secret for local development.
const DEV_JWT_SECRET: &str = "parlor-dev-secret";

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database URL.
    pub database_url: String,
    /// JWT secret.
    pub jwt_secret: String,
    /// Whether the JWT secret came from the environment.
    pub jwt_secret_from_env: bool,
    /// JWT expiration in hours.
    pub jwt_expiration_hours: u64,
    /// Root directory for uploaded files (profile pictures).
    pub upload_dir: String,
    /// Log level.
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = env::var("PARLOR_JWT_SECRET").ok();
        let jwt_secret_from_env = jwt_secret.is_some();

        Ok(Self {
            host: env::var("PARLOR_SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PARLOR_SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:parlor.db?mode=rwc".to_string()),
            jwt_secret: jwt_secret.unwrap_or_else(|| DEV_JWT_SECRET.to_string()),
            jwt_secret_from_env,
            jwt_expiration_hours: env::var("PARLOR_JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .unwrap_or(24),
            upload_dir: env::var("PARLOR_UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            log_level: env::var("PARLOR_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Returns the server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    /// Configuration for tests: dev secret, in-memory database.
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_secret_from_env: false,
            jwt_expiration_hours: 24,
            upload_dir: "uploads".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_addr() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.server_addr(), "127.0.0.1:8080");
    }
}
