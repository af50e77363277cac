//! # Outbound Notifications
//!
//! The session service hands activation and restore links to a [`Notifier`].
//! Delivery is best effort: callers log a failure and carry on.

pub mod http;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::config::NotificationConfig;
use crate::errors::Result;

pub use http::HttpNotifier;

/// Mail delivery seam used by the session service.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Mail the activation URL to a freshly registered address.
    async fn send_activation_email(&self, email: &str, activation_url: &str) -> Result<()>;

    /// Mail the restore proof (the account's activation link).
    async fn send_password_restore_email(&self, email: &str, activation_link: &str) -> Result<()>;
}

/// Writes notifications to the log instead of sending mail.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_activation_email(&self, email: &str, activation_url: &str) -> Result<()> {
        info!(email = %email, activation_url = %activation_url, "Activation mail (log only)");
        Ok(())
    }

    async fn send_password_restore_email(&self, email: &str, activation_link: &str) -> Result<()> {
        info!(email = %email, activation_link = %activation_link, "Password restore mail (log only)");
        Ok(())
    }
}

/// Pick the notifier for this deployment: HTTP mail API when configured, log otherwise.
pub fn build_notifier(config: &NotificationConfig) -> Result<Arc<dyn Notifier>> {
    if config.mail_enabled() {
        Ok(Arc::new(HttpNotifier::from_config(config)?))
    } else {
        info!("No mail API configured, notifications will only be logged");
        Ok(Arc::new(LogNotifier))
    }
}
