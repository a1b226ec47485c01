use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

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
    pub tracker: TrackerConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let snapshot_path = env::var("AWARDS_SNAPSHOT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SNAPSHOT_PATH));
        let staleness = hours_setting("AWARDS_STALENESS_HOURS", DEFAULT_STALENESS_HOURS)?;
        let refresh_interval = hours_setting(
            "AWARDS_REFRESH_INTERVAL_HOURS",
            DEFAULT_REFRESH_INTERVAL_HOURS,
        )?;
        let timeout_secs = positive_u64("AWARDS_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS)?;
        let user_agent =
            env::var("AWARDS_USER_AGENT").unwrap_or_else(|_| default_user_agent().to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            tracker: TrackerConfig {
                snapshot_path,
                staleness,
                refresh_interval,
                fetch_timeout: Duration::from_secs(timeout_secs),
                user_agent,
            },
        })
    }
}

const DEFAULT_SNAPSHOT_PATH: &str = "awards.json";
const DEFAULT_STALENESS_HOURS: u64 = 24;
const DEFAULT_REFRESH_INTERVAL_HOURS: u64 = 12;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

fn default_user_agent() -> &'static str {
    concat!("deadline-tracker/", env!("CARGO_PKG_VERSION"))
}

fn positive_u64(variable: &'static str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(variable) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { variable })?,
        Err(_) => default,
    };

    if value == 0 {
        return Err(ConfigError::InvalidNumber { variable });
    }
    Ok(value)
}

fn hours_setting(variable: &'static str, default: u64) -> Result<Duration, ConfigError> {
    positive_u64(variable, default)?
        .checked_mul(3600)
        .map(Duration::from_secs)
        .ok_or(ConfigError::InvalidNumber { variable })
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
}

/// Snapshot location and refresh cadence for the deadline tracker.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub snapshot_path: PathBuf,
    /// Minimum age of `_fetchedAt` before an award is polled again.
    pub staleness: Duration,
    pub refresh_interval: Duration,
    pub fetch_timeout: Duration,
    pub user_agent: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            staleness: Duration::from_secs(DEFAULT_STALENESS_HOURS * 3600),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_HOURS * 3600),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            user_agent: default_user_agent().to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { variable: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { variable } => {
                write!(f, "{variable} must be a positive whole number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
