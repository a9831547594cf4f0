//! Configuration module
//!
//! Settings for the HTTP surface, the hosting provider, the archive pipeline and
//! persistence, read from the environment (and `.env` when present).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const SERVER_PORT: u16 = 4000;
const DB_MAX_CONNECTIONS: u32 = 10;
const HOSTING_TIMEOUT_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS: u64 = 60;
const MAX_UPLOAD_SIZE_MB: usize = 10;
const QUEUE_CAPACITY: usize = 1024;
const PUBLISH_WORKERS: usize = 4;
const QUEUE_REDELIVERY_DELAY_MS: u64 = 500;

const DEFAULT_TOKEN_URL: &str = "https://api.imgur.com/oauth2/token";
const DEFAULT_UPLOAD_URL: &str = "https://api.imgur.com/3/image";
const DEFAULT_DELETE_URL: &str = "https://api.imgur.com/3/image";

/// How upload requests authenticate against the hosting provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostingAuthMode {
    /// `Authorization: Bearer <token>` from the token endpoint.
    Bearer,
    /// `Authorization: Client-ID <id>`; anonymous uploads.
    ClientId,
}

impl HostingAuthMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "bearer" => Some(HostingAuthMode::Bearer),
            "client-id" | "client_id" | "clientid" => Some(HostingAuthMode::ClientId),
            _ => None,
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    // Hosting provider
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub grant_type: String,
    pub token_url: String,
    pub upload_url: String,
    pub delete_url: String,
    pub hosting_auth_mode: HostingAuthMode,
    pub hosting_timeout: Duration,
    pub request_timeout: Duration,
    pub max_upload_size_bytes: usize,
    // Archive pipeline
    pub archive_enabled: bool,
    pub archive_root: PathBuf,
    pub queue_capacity: usize,
    pub publish_workers: usize,
    pub queue_redelivery_delay: Duration,
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let hosting_auth_mode = match env::var("HOSTING_AUTH_MODE") {
            Ok(value) => HostingAuthMode::parse(&value).ok_or_else(|| {
                anyhow::anyhow!(
                    "HOSTING_AUTH_MODE must be 'bearer' or 'client-id', got '{}'",
                    value
                )
            })?,
            Err(_) => HostingAuthMode::Bearer,
        };

        let max_upload_size_mb: usize = parse_or("MAX_UPLOAD_SIZE_MB", MAX_UPLOAD_SIZE_MB);

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty()),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS),
            client_id: env::var("IMGUR_CLIENT_ID").unwrap_or_default(),
            client_secret: env::var("IMGUR_CLIENT_SECRET").unwrap_or_default(),
            refresh_token: env::var("IMGUR_REFRESH_TOKEN").unwrap_or_default(),
            grant_type: env::var("IMGUR_GRANT_TYPE")
                .unwrap_or_else(|_| "refresh_token".to_string()),
            token_url: env::var("IMGUR_TOKEN_URL").unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string()),
            upload_url: env::var("IMGUR_UPLOAD_URL")
                .unwrap_or_else(|_| DEFAULT_UPLOAD_URL.to_string()),
            delete_url: env::var("IMGUR_DELETE_URL")
                .unwrap_or_else(|_| DEFAULT_DELETE_URL.to_string()),
            hosting_auth_mode,
            hosting_timeout: Duration::from_secs(parse_or(
                "HOSTING_TIMEOUT_SECS",
                HOSTING_TIMEOUT_SECS,
            )),
            request_timeout: Duration::from_secs(parse_or(
                "REQUEST_TIMEOUT_SECS",
                REQUEST_TIMEOUT_SECS,
            )),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            archive_enabled: env::var("ARCHIVE_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
            archive_root: PathBuf::from(
                env::var("ARCHIVE_ROOT").unwrap_or_else(|_| "./data/uploads".to_string()),
            ),
            queue_capacity: parse_or("QUEUE_CAPACITY", QUEUE_CAPACITY),
            publish_workers: parse_or("PUBLISH_WORKERS", PUBLISH_WORKERS),
            queue_redelivery_delay: Duration::from_millis(parse_or(
                "QUEUE_REDELIVERY_DELAY_MS",
                QUEUE_REDELIVERY_DELAY_MS,
            )),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.client_id.trim().is_empty() && self.is_production() {
            return Err(anyhow::anyhow!("IMGUR_CLIENT_ID must be set in production"));
        }
        if self.hosting_auth_mode == HostingAuthMode::Bearer && self.is_production() {
            if self.client_secret.trim().is_empty() {
                return Err(anyhow::anyhow!(
                    "IMGUR_CLIENT_SECRET must be set in production"
                ));
            }
            if self.refresh_token.trim().is_empty() {
                return Err(anyhow::anyhow!(
                    "IMGUR_REFRESH_TOKEN must be set in production"
                ));
            }
        }
        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }
        if self.queue_capacity == 0 {
            return Err(anyhow::anyhow!("QUEUE_CAPACITY must be greater than 0"));
        }
        if self.publish_workers == 0 {
            return Err(anyhow::anyhow!("PUBLISH_WORKERS must be greater than 0"));
        }
        if self.hosting_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(anyhow::anyhow!("Timeouts must be greater than 0"));
        }
        Ok(())
    }

    /// Configuration for tests and local tooling; all endpoints point at `base_url`.
    pub fn for_endpoints(base_url: &str, archive_root: PathBuf) -> Self {
        let base = base_url.trim_end_matches('/');
        Config {
            server_port: SERVER_PORT,
            environment: "test".to_string(),
            database_url: None,
            db_max_connections: DB_MAX_CONNECTIONS,
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            refresh_token: "test-refresh".to_string(),
            grant_type: "refresh_token".to_string(),
            token_url: format!("{}/oauth2/token", base),
            upload_url: format!("{}/3/image", base),
            delete_url: format!("{}/3/image", base),
            hosting_auth_mode: HostingAuthMode::Bearer,
            hosting_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            max_upload_size_bytes: MAX_UPLOAD_SIZE_MB * 1024 * 1024,
            archive_enabled: true,
            archive_root,
            queue_capacity: QUEUE_CAPACITY,
            publish_workers: 2,
            queue_redelivery_delay: Duration::from_millis(20),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_mode_parsing() {
        assert_eq!(HostingAuthMode::parse("bearer"), Some(HostingAuthMode::Bearer));
        assert_eq!(HostingAuthMode::parse("Client-ID"), Some(HostingAuthMode::ClientId));
        assert_eq!(HostingAuthMode::parse("oauth"), None);
    }

    #[test]
    fn production_requires_hosting_secrets() {
        let mut config = Config::for_endpoints("http://localhost:9", PathBuf::from("/tmp/x"));
        config.environment = "production".to_string();
        assert!(config.validate().is_ok());

        config.refresh_token.clear();
        assert!(config.validate().is_err());

        config.hosting_auth_mode = HostingAuthMode::ClientId;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn endpoints_are_derived_from_base_url() {
        let config = Config::for_endpoints("http://127.0.0.1:1234/", PathBuf::from("/tmp/x"));
        assert_eq!(config.token_url, "http://127.0.0.1:1234/oauth2/token");
        assert_eq!(config.upload_url, "http://127.0.0.1:1234/3/image");
        assert!(!config.is_production());
    }

    #[test]
    fn zero_workers_rejected() {
        let mut config = Config::for_endpoints("http://localhost:9", PathBuf::from("/tmp/x"));
        config.publish_workers = 0;
        assert!(config.validate().is_err());
    }
}
