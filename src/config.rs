use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::infrastructure::gateway::GatewayConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings read from the environment (a `.env` file is honoured by `main`).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub gateway: GatewayConfig,
    pub admin_api_key: String,
    pub uploads_dir: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds settings from any name → value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let or_default = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let port = parse(&lookup, "PORT", 8080u16)?;
        let timeout_secs = parse(&lookup, "GATEWAY_TIMEOUT_SECS", 10u64)?;

        Ok(Settings {
            database_url: required("DATABASE_URL")?,
            host: or_default("HOST", "0.0.0.0"),
            port,
            gateway: GatewayConfig {
                base_url: or_default("GATEWAY_BASE_URL", "https://api.razorpay.com/v1"),
                key_id: required("GATEWAY_KEY_ID")?,
                key_secret: required("GATEWAY_KEY_SECRET")?,
                webhook_secret: required("GATEWAY_WEBHOOK_SECRET")?,
                currency: or_default("GATEWAY_CURRENCY", "INR"),
                timeout: Duration::from_secs(timeout_secs),
            },
            admin_api_key: required("ADMIN_API_KEY")?,
            uploads_dir: PathBuf::from(or_default("UPLOADS_DIR", "./uploads")),
        })
    }
}

fn parse<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
