//! # Accountplane
//!
//! Account registration and session lifecycle service: sign-up with mailed
//! activation links, password login issuing signed session tokens that can be
//! revoked server-side, profile updates, password restore, and an admin-only
//! account listing.
//!
//! ## Architecture
//!
//! ```text
//! REST API (axum) → Session / Activation services → Account repository (SQLx)
//!        ↓                       ↓
//!  Access control          Notifier (mail API or log)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use accountplane::{config::load_config, run_server, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = load_config()?;
//!     run_server(config).await
//! }
//! ```

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod observability;
pub mod storage;

pub use config::AppConfig;
pub use errors::{Error, Result};

use api::{start_api_server, ApiState};
use notify::build_notifier;
use observability::log_config_info;
use storage::create_pool;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Open the store, wire the services and serve HTTP until shutdown.
pub async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!(app_name = APP_NAME, version = VERSION, "Starting accountplane");
    log_config_info(&config);

    if config.auth.jwt_secret == config::AuthConfig::default().jwt_secret {
        tracing::warn!("JWT_SECRET is not set; using the built-in development secret");
    }

    let pool = create_pool(&config.database).await?;
    let notifier = build_notifier(&config.notification)?;
    let state = ApiState::new(pool, &config, notifier)?;

    start_api_server(&config.server, state).await
}
