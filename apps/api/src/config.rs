//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | variable               | default     |
//! |------------------------|-------------|
//! | `PORT`                 | `3000`      |
//! | `BIND_ADDR`            | `0.0.0.0`   |
//! | `DATABASE_URL`         | `cotiza.db` |
//! | `DB_MAX_CONNECTIONS`   | `5`         |
//! | `SESSION_SECRET`       | dev secret  |
//! | `SESSION_MAX_AGE_SECS` | `28800`     |
//! | `SESSION_IDLE_SECS`    | `1800`      |
//! | `COOKIE_SECURE`        | `false`     |
//! | `CHROMIUM_PATH`        | `chromium`  |
//! | `PDF_TIMEOUT_SECS`     | `30`        |
//! | `PDF_BACKGROUND_URL`   | unset       |
//! | `EMPRESA_*`            | placeholders|

use std::env;
use std::str::FromStr;
use std::time::Duration;

use cotiza_core::pdf::EmpresaInfo;
use cotiza_db::DbConfig;
use serde::{Deserialize, Serialize};

/// Secret used when `SESSION_SECRET` is not set. Fine for development only.
pub const DEV_SESSION_SECRET: &str = "cotiza-dev-secret-change-in-production";

/// API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP port
    pub port: u16,

    /// Interface to bind
    pub bind_addr: String,

    /// SQLite file path (a `sqlite://` prefix is accepted)
    pub database_url: String,

    pub db_max_connections: u32,

    /// HMAC key for session cookies. Never serialized.
    #[serde(skip_serializing, default)]
    pub session_secret: String,

    /// Absolute session lifetime in seconds
    pub session_max_age_secs: i64,

    /// Inactivity window in seconds; an idle session is refused
    pub session_idle_secs: i64,

    /// Adds `Secure` to the session cookie (HTTPS deployments)
    pub cookie_secure: bool,

    /// Headless browser binary used to print quotes
    pub chromium_path: String,

    pub pdf_timeout_secs: u64,

    /// Letterhead image for the positioned quote template
    pub pdf_background_url: Option<String>,

    /// Issuing company printed on quotes
    pub empresa: EmpresaInfo,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let config = ApiConfig {
            port: parse(&lookup, "PORT", 3000)?,
            bind_addr: text("BIND_ADDR", "0.0.0.0"),
            database_url: text("DATABASE_URL", "cotiza.db"),
            db_max_connections: parse(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            session_secret: text("SESSION_SECRET", DEV_SESSION_SECRET),
            session_max_age_secs: parse(&lookup, "SESSION_MAX_AGE_SECS", 8 * 60 * 60)?,
            session_idle_secs: parse(&lookup, "SESSION_IDLE_SECS", 30 * 60)?,
            cookie_secure: parse(&lookup, "COOKIE_SECURE", false)?,
            chromium_path: text("CHROMIUM_PATH", "chromium"),
            pdf_timeout_secs: parse(&lookup, "PDF_TIMEOUT_SECS", 30)?,
            pdf_background_url: lookup("PDF_BACKGROUND_URL").filter(|v| !v.trim().is_empty()),
            empresa: EmpresaInfo {
                nombre: text("EMPRESA_NOMBRE", "Empresa Demo SpA"),
                rut: text("EMPRESA_RUT", "76.000.000-0"),
                direccion: text("EMPRESA_DIRECCION", "Av. Siempre Viva 123, Concepción"),
                telefono: text("EMPRESA_TELEFONO", "+56 41 200 0000"),
                email: text("EMPRESA_EMAIL", "ventas@empresa.cl"),
            },
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        if config.session_idle_secs <= 0 {
            return Err(ConfigError::InvalidValue("SESSION_IDLE_SECS".to_string()));
        }
        if config.session_max_age_secs < config.session_idle_secs {
            return Err(ConfigError::SessionWindow {
                max_age: config.session_max_age_secs,
                idle: config.session_idle_secs,
            });
        }

        Ok(config)
    }

    /// `bind_addr:port`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Whether the built-in development secret is in use.
    pub fn uses_dev_secret(&self) -> bool {
        self.session_secret == DEV_SESSION_SECRET
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::from_url(&self.database_url).max_connections(self.db_max_connections)
    }

    pub fn pdf_timeout(&self) -> Duration {
        Duration::from_secs(self.pdf_timeout_secs)
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key).map(|v| v.trim().to_string()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("SESSION_MAX_AGE_SECS ({max_age}) must not be shorter than SESSION_IDLE_SECS ({idle})")]
    SessionWindow { max_age: i64, idle: i64 },
}
