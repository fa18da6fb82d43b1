/// Configuration for catalog-service, read from the environment.
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Must match the secret social-service signs tokens with
pub const DEV_JWT_SECRET: &str = "agora-development-secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub host: String,
    pub http_port: u16,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// In-memory catalog when unset
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Tokens are only verified here, never issued
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .finish()
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Config {
            app: AppConfig {
                env: env_or("APP_ENV", "development"),
                host: env_or("APP_HOST", "0.0.0.0"),
                http_port: env_parse("PORT", 8007),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
                max_connections: env_parse("DB_MAX_CONNECTIONS", 10),
                min_connections: env_parse("DB_MIN_CONNECTIONS", 1),
            },
            auth: AuthConfig {
                jwt_secret: env_or("JWT_SECRET", DEV_JWT_SECRET),
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.app.is_production() && self.auth.jwt_secret == DEV_JWT_SECRET {
            bail!("JWT_SECRET must be set in production");
        }
        if self.database.min_connections > self.database.max_connections {
            bail!("DB_MIN_CONNECTIONS cannot exceed DB_MAX_CONNECTIONS");
        }
        Ok(())
    }
}
