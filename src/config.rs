use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub uploads: UploadConfig,
    pub rate_limit: RateLimitConfig,
    pub catalog: CatalogConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url.starts_with("memory:")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub session_ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_image_bytes: usize,
    pub max_media_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub environment: Environment,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

const MIB: usize = 1024 * 1024;

impl Default for Config {
    /// Development defaults: in-memory store, local upload directory.
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                port: 8000,
            },
            database: DatabaseConfig {
                url: "memory://".to_string(),
                max_connections: Some(10),
                min_connections: Some(1),
            },
            auth: AuthConfig {
                session_ttl_hours: 24 * 7,
            },
            uploads: UploadConfig {
                dir: PathBuf::from("uploads"),
                max_image_bytes: 5 * MIB,
                max_media_bytes: 100 * MIB,
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                window_secs: 60,
            },
            catalog: CatalogConfig {
                default_page_size: 10,
                max_page_size: 50,
            },
            app: AppConfig {
                name: "CourseHub".to_string(),
                environment: Environment::Development,
            },
        }
    }
}

/// Reads `key` and parses it, falling back to `default` when unset.
fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(val) => val
            .parse()
            .with_context(|| format!("Failed to parse {key}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        // Server configuration
        let host = parse_or("SERVER_HOST", defaults.server.host)?;
        let port = parse_or("SERVER_PORT", defaults.server.port)?;

        // Database configuration
        let db_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let db_max_connections = Some(parse_or("DATABASE_MAX_CONNECTIONS", 10)?);
        let db_min_connections = Some(parse_or("DATABASE_MIN_CONNECTIONS", 1)?);

        // Auth configuration
        let session_ttl_hours = parse_or("SESSION_TTL_HOURS", defaults.auth.session_ttl_hours)?;
        if session_ttl_hours <= 0 {
            anyhow::bail!("SESSION_TTL_HOURS must be positive");
        }

        // Upload configuration
        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.uploads.dir);
        let max_image_bytes = parse_or("UPLOAD_MAX_IMAGE_BYTES", defaults.uploads.max_image_bytes)?;
        let max_media_bytes = parse_or("UPLOAD_MAX_MEDIA_BYTES", defaults.uploads.max_media_bytes)?;

        // Rate limiting
        let rate_limit_enabled = parse_or("RATE_LIMIT_ENABLED", defaults.rate_limit.enabled)?;
        let window_secs = parse_or("RATE_LIMIT_WINDOW_SECS", defaults.rate_limit.window_secs)?;

        // Catalog paging
        let default_page_size =
            parse_or("CATALOG_DEFAULT_PAGE_SIZE", defaults.catalog.default_page_size)?;
        let max_page_size = parse_or("CATALOG_MAX_PAGE_SIZE", defaults.catalog.max_page_size)?;

        // App configuration
        let environment = env::var("APP_ENVIRONMENT")
            .ok()
            .and_then(|val| val.parse().ok())
            .unwrap_or_default();
        let app_name = env::var("APP_NAME").unwrap_or(defaults.app.name);

        Ok(Config {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: db_url,
                max_connections: db_max_connections,
                min_connections: db_min_connections,
            },
            auth: AuthConfig { session_ttl_hours },
            uploads: UploadConfig {
                dir: upload_dir,
                max_image_bytes,
                max_media_bytes,
            },
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                window_secs: window_secs.max(1),
            },
            catalog: CatalogConfig {
                default_page_size: default_page_size.clamp(1, max_page_size.max(1)),
                max_page_size: max_page_size.max(1),
            },
            app: AppConfig {
                name: app_name,
                environment,
            },
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }

    pub fn is_production(&self) -> bool {
        self.app.environment == Environment::Production
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Environment::Production),
            "staging" => Ok(Environment::Staging),
            "development" => Ok(Environment::Development),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_memory_store() {
        let config = Config::default();
        assert!(config.database.is_memory());
        assert_eq!(config.uploads.max_image_bytes, 5 * 1024 * 1024);
        assert_eq!(config.uploads.max_media_bytes, 100 * 1024 * 1024);
        assert_eq!(config.server_addr().port(), 8000);
    }

    #[test]
    fn environment_parses_case_insensitively() {
        assert_eq!("PRODUCTION".parse(), Ok(Environment::Production));
        assert!("qa".parse::<Environment>().is_err());
    }
}
