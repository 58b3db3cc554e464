//! Config - Application configuration from environment variables

use dotenv::dotenv;
use std::env;
use std::str::FromStr;
use tracing::{info, warn};

const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` selects in-memory storage.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    pub max_connections: u32,
    pub app_env: String,
    pub global_prefix: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub bcrypt_cost: u32,
    pub cors_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_expiry_hours: 24,
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            max_connections: 10,
            app_env: "development".to_string(),
            global_prefix: "api".to_string(),
            admin_email: None,
            admin_password: None,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
    reason: &str,
) -> Result<T, ConfigError>
where
    T: FromStr,
{
    match lookup(var) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            reason: reason.to_string(),
        }),
        None => Ok(default),
    }
}

impl Config {
    /// Loads `.env` (if present) then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using default (not secure for production!)");
            defaults.jwt_secret.clone()
        });

        let jwt_expiry_hours = parse_or(
            &lookup,
            "JWT_EXPIRY_HOURS",
            defaults.jwt_expiry_hours,
            "must be a number of hours",
        )?;
        if jwt_expiry_hours <= 0 {
            return Err(ConfigError::Invalid {
                var: "JWT_EXPIRY_HOURS",
                reason: "must be positive".to_string(),
            });
        }

        let server_port = parse_or(
            &lookup,
            "SERVER_PORT",
            defaults.server_port,
            "must be a number between 0-65535",
        )?;
        let max_connections = parse_or(
            &lookup,
            "MAX_DB_CONNECTIONS",
            defaults.max_connections,
            "must be a positive number",
        )?;
        let bcrypt_cost = parse_or(
            &lookup,
            "BCRYPT_COST",
            defaults.bcrypt_cost,
            "must be a number between 4-31",
        )?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                var: "BCRYPT_COST",
                reason: "must be a number between 4-31".to_string(),
            });
        }

        let global_prefix = lookup("GLOBAL_PREFIX")
            .map(|p| p.trim_matches('/').to_string())
            .unwrap_or(defaults.global_prefix);

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.cors_origins);

        Ok(Config {
            database_url: lookup("DATABASE_URL"),
            jwt_secret,
            jwt_expiry_hours,
            server_host: lookup("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port,
            max_connections,
            app_env: lookup("APP_ENV").unwrap_or(defaults.app_env),
            global_prefix,
            admin_email: lookup("ADMIN_EMAIL"),
            admin_password: lookup("ADMIN_PASSWORD"),
            bcrypt_cost,
            cors_origins,
        })
    }

    /// Logs the configuration with secrets masked.
    pub fn print_info(&self) {
        info!("Server Configuration:");
        info!("   Environment: {}", self.app_env);
        info!("   Server Address: {}:{}", self.server_host, self.server_port);
        info!("   Routes Prefix: /{}/v1", self.global_prefix);
        match &self.database_url {
            Some(url) => info!("   Database: {}", Self::mask_url(url)),
            None => warn!("   Database: none, using in-memory storage"),
        }
        info!("   Max DB Connections: {}", self.max_connections);
        info!("   JWT Expiry: {}h", self.jwt_expiry_hours);
        if self.jwt_secret == DEFAULT_JWT_SECRET {
            warn!("   JWT Secret: USING DEFAULT (INSECURE!)");
        } else {
            info!("   JWT Secret: custom secret configured");
        }
        info!("   CORS Origins: {}", self.cors_origins.join(", "));
    }

    /// Masks the credentials of a database URL for logging
    fn mask_url(url: &str) -> String {
        if let (Some(at_pos), Some(scheme_end)) = (url.rfind('@'), url.find("://")) {
            let scheme = &url[..scheme_end + 3];
            let after_at = &url[at_pos..];
            return format!("{}***{}", scheme, after_at);
        }
        "***".to_string()
    }
}
