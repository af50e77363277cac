//! Mail delivery through a transactional JSON mail API.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

use super::Notifier;
use crate::config::NotificationConfig;
use crate::errors::{Error, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody {
    sender: EmailAddress,
    to: Vec<EmailAddress>,
    subject: String,
    html_content: String,
    text_content: String,
}

/// Posts mail to `mail_api_url` with the key in an `api-key` header.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    sender_email: String,
    sender_name: Option<String>,
}

impl HttpNotifier {
    pub fn from_config(config: &NotificationConfig) -> Result<Self> {
        let endpoint = config
            .mail_api_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| Error::config("Mail API URL is not configured"))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::config(format!("Failed to build mail HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.mail_api_key.clone(),
            sender_email: config.sender_email.clone(),
            sender_name: config.sender_name.clone(),
        })
    }

    async fn send(&self, to: &str, subject: &str, text: String, html: String) -> Result<()> {
        let body = SendEmailBody {
            sender: EmailAddress {
                email: self.sender_email.clone(),
                name: self.sender_name.clone(),
            },
            to: vec![EmailAddress { email: to.to_string(), name: None }],
            subject: subject.to_string(),
            html_content: html,
            text_content: text,
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(&body);

        if let Some(key) = &self.api_key {
            request = request.header("api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::notification(format!("Mail delivery failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::notification(format!(
                "Mail API returned status {}: {}",
                status, detail
            )));
        }

        debug!(status = status.as_u16(), "Mail accepted by API");
        Ok(())
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    #[instrument(skip(self, activation_url), fields(email = %email), name = "notify_activation")]
    async fn send_activation_email(&self, email: &str, activation_url: &str) -> Result<()> {
        let text = format!("Activate your account by opening {}", activation_url);
        let html = format!(
            "<p>Activate your account by following <a href=\"{0}\">{0}</a>.</p>",
            activation_url
        );
        self.send(email, "Activate your account", text, html).await
    }

    #[instrument(skip(self, activation_link), fields(email = %email), name = "notify_password_restore")]
    async fn send_password_restore_email(&self, email: &str, activation_link: &str) -> Result<()> {
        let text = format!("Use this code to restore your password: {}", activation_link);
        let html = format!(
            "<p>Use this code to restore your password: <code>{}</code></p>",
            activation_link
        );
        self.send(email, "Restore your password", text, html).await
    }
}
