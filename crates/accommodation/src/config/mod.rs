use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

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
    pub search: SearchConfig,
    pub estate: EstateSourceConfig,
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

        let max_distance_miles = match env::var("APP_SEARCH_MAX_DISTANCE_MILES") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|miles| miles.is_finite() && *miles > 0.0)
                .ok_or(ConfigError::InvalidSearchDistance)?,
            Err(_) => SearchConfig::DEFAULT_MAX_DISTANCE_MILES,
        };

        let default_page_size = match env::var("APP_DEFAULT_PAGE_SIZE") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or(ConfigError::InvalidPageSize)?,
            Err(_) => SearchConfig::DEFAULT_PAGE_SIZE,
        };

        let estate_csv = env::var("APP_ESTATE_CSV").ok().map(PathBuf::from);
        let postcode_districts_csv = env::var("APP_POSTCODE_DISTRICTS_CSV")
            .ok()
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            search: SearchConfig {
                max_distance_miles,
                default_page_size,
            },
            estate: EstateSourceConfig {
                estate_csv,
                postcode_districts_csv,
            },
        })
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Defaults applied to bed searches and paginated listings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    pub max_distance_miles: f64,
    pub default_page_size: u32,
}

impl SearchConfig {
    pub const DEFAULT_MAX_DISTANCE_MILES: f64 = 50.0;
    pub const DEFAULT_PAGE_SIZE: u32 = 10;
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_distance_miles: Self::DEFAULT_MAX_DISTANCE_MILES,
            default_page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

/// Optional CSV sources used to seed the estate at startup.
#[derive(Debug, Clone, Default)]
pub struct EstateSourceConfig {
    pub estate_csv: Option<PathBuf>,
    pub postcode_districts_csv: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidSearchDistance,
    InvalidPageSize,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSearchDistance => write!(
                f,
                "APP_SEARCH_MAX_DISTANCE_MILES must be a positive number of miles"
            ),
            ConfigError::InvalidPageSize => {
                write!(f, "APP_DEFAULT_PAGE_SIZE must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidSearchDistance
            | ConfigError::InvalidPageSize => None,
        }
    }
}
