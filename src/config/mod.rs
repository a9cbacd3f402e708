use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::leads::{AdmissionConfig, CrmSettings};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub admission: AdmissionConfig,
    pub crm: CrmConfig,
}

impl AppConfig {
    /// Read `.env` (when present) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = AppEnvironment::from_str(
            &lookup("APP_ENV").unwrap_or_else(|| "development".to_string()),
        );

        let host = lookup("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = lookup("APP_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = lookup("APP_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let defaults = AdmissionConfig::default();
        let admission = AdmissionConfig {
            cooldown_minutes: parse_or(
                &lookup,
                "MINUTES_AMONG_SIMULATION",
                defaults.cooldown_minutes,
            )?,
            transaction_timeout: Duration::from_millis(parse_or(
                &lookup,
                "STORE_TRANSACTION_TIMEOUT_MS",
                defaults.transaction_timeout.as_millis() as u64,
            )?),
        };

        let base_url = lookup("CRM_API_URL")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingVar("CRM_API_URL"))?;
        let crm_defaults = CrmSettings::default();
        let crm = CrmConfig {
            base_url,
            settings: CrmSettings {
                timeout: Duration::from_millis(parse_or(
                    &lookup,
                    "CRM_TIMEOUT_MS",
                    crm_defaults.timeout.as_millis() as u64,
                )?),
                max_retries: parse_or(&lookup, "CRM_MAX_RETRIES", crm_defaults.max_retries)?,
                retry_delay: Duration::from_millis(parse_or(
                    &lookup,
                    "CRM_RETRY_DELAY_MS",
                    crm_defaults.retry_delay.as_millis() as u64,
                )?),
            },
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
            },
            admission,
            crm,
        })
    }
}

fn parse_or<F, V>(lookup: &F, key: &'static str, default: V) -> Result<V, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    V: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<V>().map_err(|_| ConfigError::InvalidNumber {
            key,
            value: raw,
        }),
        None => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Where and how new leads are pushed to the CRM.
#[derive(Debug, Clone)]
pub struct CrmConfig {
    pub base_url: String,
    pub settings: CrmSettings,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingVar(&'static str),
    InvalidNumber { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingVar(key) => write!(f, "{key} must be set"),
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be an integer (found '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::MissingVar(_)
            | ConfigError::InvalidNumber { .. } => None,
        }
    }
}
