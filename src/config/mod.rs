//! # Configuration Management
//!
//! Configuration is read once at startup (environment variables, optionally
//! seeded from a `.env` file) and passed down explicitly. Nothing below the
//! binary reads the process environment.

pub mod settings;

pub use settings::{
    AppConfig, AuthConfig, DatabaseConfig, NotificationConfig, ObservabilityConfig, ServerConfig,
};

use crate::errors::Result;

/// Load `.env` if present, then build and validate [`AppConfig`].
pub fn load_config() -> Result<AppConfig> {
    // Runs before logging is installed.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    AppConfig::from_env()
}
