use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing::warn;

use crate::auth::password::DEFAULT_COST;

/// Secret shipped in old `.env` templates. Never acceptable in production.
pub const INSECURE_DEFAULT_SECRET: &str = "your_jwt_secret";

/// Shortest secret accepted in production, in bytes.
pub const MIN_PRODUCTION_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => anyhow::bail!("unknown APP_ENV `{other}`"),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    /// bcrypt work factor for new password hashes.
    pub password_cost: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = match std::env::var("APP_ENV") {
            Ok(v) => v.parse()?,
            Err(_) => Environment::Development,
        };
        let database_url = std::env::var("DATABASE_URL")?;
        let secret = resolve_jwt_secret(environment, std::env::var("JWT_SECRET").ok())?;
        let jwt = JwtConfig {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "woodwardian".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "woodwardian-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES", 60),
        };
        Ok(Self {
            environment,
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", 10),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT", 3000),
            jwt,
            password_cost: DEFAULT_COST,
        })
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Decide which signing secret to run with.
///
/// Production refuses to start without a strong secret. Other environments fall
/// back to the insecure default so a fresh checkout runs without setup.
pub fn resolve_jwt_secret(
    environment: Environment,
    secret: Option<String>,
) -> anyhow::Result<String> {
    let secret = secret.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    if environment.is_production() {
        let Some(secret) = secret else {
            anyhow::bail!("JWT_SECRET is not defined; refusing to start in production");
        };
        if secret == INSECURE_DEFAULT_SECRET {
            anyhow::bail!("JWT_SECRET is the insecure default; refusing to start in production");
        }
        if secret.len() < MIN_PRODUCTION_SECRET_LEN {
            anyhow::bail!(
                "JWT_SECRET must be at least {MIN_PRODUCTION_SECRET_LEN} bytes in production"
            );
        }
        return Ok(secret);
    }

    match secret {
        Some(secret) => Ok(secret),
        None => {
            warn!(%environment, "JWT_SECRET not set; using insecure default secret");
            Ok(INSECURE_DEFAULT_SECRET.to_string())
        }
    }
}
