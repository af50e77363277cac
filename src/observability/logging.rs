//! # Structured Logging
//!
//! Subscriber installation plus the per-request span used by the HTTP
//! adapter.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};

/// Create a tracing span for request tracking.
///
/// ```rust,ignore
/// let span = request_span!("POST", "/api/v1/login");
/// ```
#[macro_export]
macro_rules! request_span {
    ($method:expr, $path:expr) => {
        tracing::info_span!(
            "http_request",
            method = %$method,
            path = %$path,
            request_id = %uuid::Uuid::new_v4(),
            account_id = tracing::field::Empty
        )
    };
    ($method:expr, $path:expr, $($field:tt)*) => {
        tracing::info_span!(
            "http_request",
            method = %$method,
            path = %$path,
            request_id = %uuid::Uuid::new_v4(),
            account_id = tracing::field::Empty,
            $($field)*
        )
    };
}

/// Build the filter from `RUST_LOG`, falling back to the configured level.
pub fn build_env_filter(config: &ObservabilityConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            Error::config(format!("Invalid log level '{}': {}", config.log_level, e))
        }),
    }
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed, which only happens in tests.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = build_env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json_logging {
        registry
            .with(fmt::layer().json().with_current_span(true).with_span_list(false))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    installed.map_err(|e| Error::config(format!("Failed to install log subscriber: {}", e)))
}

/// Log configuration at startup
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        service_name = %config.observability.service_name,
        server_address = %config.server.bind_address(),
        database_auto_migrate = config.database.auto_migrate,
        token_expiry_seconds = config.auth.token_expiry_seconds,
        admin_email_count = config.auth.admin_emails.len(),
        mail_enabled = config.notification.mail_enabled(),
        "accountplane configuration"
    );
}
