//! Activation links.
//!
//! Every account gets a random link at registration. Following it marks the
//! account activated; the same value doubles as the password restore proof.

use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::account::AccountView;
use crate::errors::{Error, Result};
use crate::storage::AccountRepository;

/// Fresh random activation link, never derived from account data.
pub fn generate_activation_link() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Public URL that activates the account owning `link`.
pub fn activation_url(api_base_url: &str, link: &str) -> String {
    format!("{}/api/v1/activate/{}", api_base_url.trim_end_matches('/'), link)
}

#[derive(Clone)]
pub struct ActivationService {
    repository: Arc<dyn AccountRepository>,
}

impl ActivationService {
    pub fn new(repository: Arc<dyn AccountRepository>) -> Self {
        Self { repository }
    }

    /// Mark the account owning `link` as activated. Idempotent.
    #[instrument(skip(self, link), name = "activate_account")]
    pub async fn activate(&self, link: &str) -> Result<AccountView> {
        let mut account = self
            .repository
            .find_by_activation_link(link)
            .await?
            .ok_or_else(|| Error::not_found("Activation link", link))?;

        if !account.is_activated {
            if self.repository.set_activated(account.id).await? {
                info!(account_id = %account.id, "Account activated");
            }
            account.is_activated = true;
        }

        Ok(account.view())
    }

    pub async fn account_by_link(&self, link: &str) -> Result<AccountView> {
        self.repository
            .find_by_activation_link(link)
            .await?
            .map(|account| account.view())
            .ok_or_else(|| Error::not_found("Activation link", link))
    }
}
