//! # Configuration Settings
//!
//! Defines the configuration structure for the accountplane service.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Minimum accepted length of the token signing secret
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    /// Server configuration
    #[validate(nested)]
    pub server: ServerConfig,

    /// Database configuration
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,

    /// Authentication configuration
    #[validate(nested)]
    pub auth: AuthConfig,

    /// Outbound notification configuration
    #[validate(nested)]
    pub notification: NotificationConfig,
}

impl AppConfig {
    /// Assemble the whole configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env(),
            observability: ObservabilityConfig::from_env(),
            auth: AuthConfig::from_env()?,
            notification: NotificationConfig::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;

        self.validate_custom()?;

        Ok(())
    }

    /// Checks the validator derive cannot express
    fn validate_custom(&self) -> Result<()> {
        if !self.database.url.starts_with("sqlite:") {
            return Err(Error::validation("Database URL must start with 'sqlite:'"));
        }

        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(Error::validation(format!(
                "JWT secret must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            )));
        }

        for url in [&self.notification.api_base_url, &self.notification.client_url] {
            let parsed = url::Url::parse(url)
                .map_err(|e| Error::validation(format!("Invalid URL '{}': {}", url, e)))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(Error::validation(format!("URL '{}' must use http or https", url)));
            }
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Server bind address
    #[validate(length(min = 1, message = "Host cannot be empty"))]
    pub host: String,

    /// Server port
    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080, enable_cors: true }
    }
}

impl ServerConfig {
    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let port = match std::env::var("ACCOUNTPLANE_PORT") {
            Ok(value) => value
                .parse()
                .map_err(|e| Error::config(format!("Invalid ACCOUNTPLANE_PORT '{}': {}", value, e)))?,
            Err(_) => defaults.port,
        };

        Ok(Self {
            host: std::env::var("ACCOUNTPLANE_HOST").unwrap_or(defaults.host),
            port,
            enable_cors: env_flag("ACCOUNTPLANE_ENABLE_CORS").unwrap_or(defaults.enable_cors),
        })
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum number of connections in the pool
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[validate(range(min = 0, max = 50, message = "Min connections must be between 0 and 50"))]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[validate(range(
        min = 1,
        max = 60,
        message = "Connect timeout must be between 1 and 60 seconds"
    ))]
    pub connect_timeout_seconds: u64,

    /// Idle timeout in seconds (0 = no timeout)
    pub idle_timeout_seconds: u64,

    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/accountplane.db".to_string(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get idle timeout as Duration (None if 0)
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        }
    }

    /// In-memory databases exist per connection, so the pool must not fan out.
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    /// Create DatabaseConfig from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            url: std::env::var("DATABASE_URL").unwrap_or(defaults.url),
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.max_connections),
            min_connections: env_parse("DATABASE_MIN_CONNECTIONS")
                .unwrap_or(defaults.min_connections),
            connect_timeout_seconds: env_parse("DATABASE_CONNECT_TIMEOUT_SECONDS")
                .unwrap_or(defaults.connect_timeout_seconds),
            idle_timeout_seconds: env_parse("DATABASE_IDLE_TIMEOUT_SECONDS")
                .unwrap_or(defaults.idle_timeout_seconds),
            auto_migrate: env_flag("DATABASE_AUTO_MIGRATE").unwrap_or(defaults.auto_migrate),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Service name attached to log lines
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "accountplane".to_string(),
            log_level: "info".to_string(),
            json_logging: false,
        }
    }
}

impl ObservabilityConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            service_name: std::env::var("ACCOUNTPLANE_SERVICE_NAME")
                .unwrap_or(defaults.service_name),
            log_level: std::env::var("ACCOUNTPLANE_LOG_LEVEL").unwrap_or(defaults.log_level),
            json_logging: env_flag("ACCOUNTPLANE_JSON_LOGGING").unwrap_or(defaults.json_logging),
        }
    }
}

/// Session token configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuthConfig {
    /// Secret used to sign session tokens
    #[validate(length(min = 1, message = "JWT secret cannot be empty"))]
    pub jwt_secret: String,

    /// Session token lifetime in seconds
    #[validate(range(
        min = 300,
        max = 2592000,
        message = "Token expiry must be between 5 minutes and 30 days"
    ))]
    pub token_expiry_seconds: u64,

    /// Issuer claim written into and required from every token
    #[validate(length(min = 1, message = "JWT issuer cannot be empty"))]
    pub jwt_issuer: String,

    /// Emails that receive the admin role when they register
    pub admin_emails: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "accountplane-default-secret-please-change-in-production".to_string(),
            token_expiry_seconds: 86400,
            jwt_issuer: "accountplane".to_string(),
            admin_emails: Vec::new(),
        }
    }
}

impl AuthConfig {
    /// Get token expiry as Duration
    pub fn token_expiry(&self) -> Duration {
        Duration::from_secs(self.token_expiry_seconds)
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.iter().any(|candidate| candidate == email)
    }

    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let token_expiry_seconds = match std::env::var("JWT_EXPIRY_SECONDS") {
            Ok(value) => value.parse().map_err(|e| {
                Error::config(format!("Invalid JWT_EXPIRY_SECONDS '{}': {}", value, e))
            })?,
            Err(_) => defaults.token_expiry_seconds,
        };

        let admin_emails = std::env::var("ACCOUNTPLANE_ADMIN_EMAILS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|email| !email.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            token_expiry_seconds,
            jwt_issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.jwt_issuer),
            admin_emails,
        })
    }
}

/// Outbound mail and link configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NotificationConfig {
    /// Public base URL of this service; activation links point here
    #[validate(length(min = 1, message = "API base URL cannot be empty"))]
    pub api_base_url: String,

    /// Front-end URL users are redirected to after activation
    #[validate(length(min = 1, message = "Client URL cannot be empty"))]
    pub client_url: String,

    /// JSON mail API endpoint; mail is only logged when unset
    pub mail_api_url: Option<String>,

    /// Credential sent in the `api-key` header
    pub mail_api_key: Option<String>,

    /// Sender address for outbound mail
    #[validate(length(min = 1, message = "Sender email cannot be empty"))]
    pub sender_email: String,

    /// Optional display name of the sender
    pub sender_name: Option<String>,

    /// Request timeout for the mail API in seconds
    #[validate(range(min = 1, max = 60, message = "Mail timeout must be between 1 and 60 seconds"))]
    pub timeout_seconds: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080".to_string(),
            client_url: "http://127.0.0.1:3000".to_string(),
            mail_api_url: None,
            mail_api_key: None,
            sender_email: "no-reply@accountplane.local".to_string(),
            sender_name: None,
            timeout_seconds: 10,
        }
    }
}

impl NotificationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn mail_enabled(&self) -> bool {
        self.mail_api_url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            api_base_url: std::env::var("API_URL").unwrap_or(defaults.api_base_url),
            client_url: std::env::var("CLIENT_URL").unwrap_or(defaults.client_url),
            mail_api_url: std::env::var("MAIL_API_URL").ok(),
            mail_api_key: std::env::var("MAIL_API_KEY").ok(),
            sender_email: std::env::var("MAIL_SENDER_EMAIL").unwrap_or(defaults.sender_email),
            sender_name: std::env::var("MAIL_SENDER_NAME").ok(),
            timeout_seconds: env_parse("MAIL_TIMEOUT_SECONDS").unwrap_or(defaults.timeout_seconds),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse::<T>().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|s| s.eq_ignore_ascii_case("true") || s == "1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_config_bind_address() {
        let config = ServerConfig { host: "0.0.0.0".to_string(), port: 8080, ..Default::default() };
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_database_config_timeouts() {
        let config = DatabaseConfig {
            connect_timeout_seconds: 15,
            idle_timeout_seconds: 300,
            ..Default::default()
        };
        assert_eq!(config.connect_timeout(), Duration::from_secs(15));
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(300)));

        let config_no_idle = DatabaseConfig { idle_timeout_seconds: 0, ..Default::default() };
        assert_eq!(config_no_idle.idle_timeout(), None);
    }

    #[test]
    fn test_database_in_memory_detection() {
        let memory = DatabaseConfig { url: "sqlite::memory:".to_string(), ..Default::default() };
        assert!(memory.is_in_memory());
        assert!(!DatabaseConfig::default().is_in_memory());
    }

    #[test]
    fn test_auth_config_admin_emails() {
        let config = AuthConfig {
            admin_emails: vec!["root@example.com".to_string()],
            ..Default::default()
        };
        assert!(config.is_admin_email("root@example.com"));
        assert!(!config.is_admin_email("Root@example.com"));
        assert_eq!(config.token_expiry(), Duration::from_secs(86400));
    }

    #[test]
    fn test_notification_mail_enabled() {
        let mut config = NotificationConfig::default();
        assert!(!config.mail_enabled());

        config.mail_api_url = Some("  ".to_string());
        assert!(!config.mail_enabled());

        config.mail_api_url = Some("https://mail.example.com/v3/send".to_string());
        assert!(config.mail_enabled());
    }

    #[test]
    fn test_config_validation_errors() {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.database.url = "postgresql://localhost/accounts".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.notification.client_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.auth.token_expiry_seconds = 10;
        assert!(config.validate().is_err());
    }
}
