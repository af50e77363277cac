//! Test database utilities for in-library tests.
//!
//! Each call yields a fresh in-memory SQLite database with all migrations
//! applied, so tests never share state. [`LogoutAfterReadRepository`] replays
//! a logout between a service's read and its write.
//!
//! This module is only available in test builds (`#[cfg(test)]`).

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::account::{Account, NewAccount};
use crate::auth::jwt::Role;
use crate::config::DatabaseConfig;
use crate::domain::AccountId;
use crate::errors::Result;
use crate::storage::{create_pool, AccountRepository, DbPool, SqlxAccountRepository};

/// Fresh migrated in-memory database.
pub async fn memory_pool() -> DbPool {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        auto_migrate: true,
        ..Default::default()
    };

    create_pool(&config).await.expect("in-memory test database should start")
}

/// Delegates to a real repository, but revokes the session of every account
/// it reads right after the read. Services see the row as it was while a
/// logout lands before their write.
pub struct LogoutAfterReadRepository {
    pub inner: Arc<SqlxAccountRepository>,
}

impl LogoutAfterReadRepository {
    async fn logout(&self, found: Result<Option<Account>>) -> Result<Option<Account>> {
        if let Some(account) = found.as_ref().ok().and_then(Option::as_ref) {
            self.inner.update_token(account.id, None).await?;
        }
        found
    }
}

#[async_trait]
impl AccountRepository for LogoutAfterReadRepository {
    async fn find_all(&self) -> Result<Vec<Account>> {
        self.inner.find_all().await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let found = self.inner.find_by_email(email).await;
        self.logout(found).await
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>> {
        let found = self.inner.find_by_id(id).await;
        self.logout(found).await
    }

    async fn find_by_activation_link(&self, link: &str) -> Result<Option<Account>> {
        let found = self.inner.find_by_activation_link(link).await;
        self.logout(found).await
    }

    async fn insert(&self, account: NewAccount) -> Result<AccountId> {
        self.inner.insert(account).await
    }

    async fn update_token(&self, id: AccountId, token: Option<&str>) -> Result<()> {
        self.inner.update_token(id, token).await
    }

    async fn clear_token_by_token(&self, token: &str) -> Result<bool> {
        self.inner.clear_token_by_token(token).await
    }

    async fn set_activated(&self, id: AccountId) -> Result<bool> {
        self.inner.set_activated(id).await
    }

    async fn update_profile(&self, id: AccountId, full_name: &str, email: &str) -> Result<()> {
        self.inner.update_profile(id, full_name, email).await
    }

    async fn replace_password(
        &self,
        id: AccountId,
        current_link: &str,
        password_hash: &str,
        next_link: &str,
    ) -> Result<bool> {
        self.inner.replace_password(id, current_link, password_hash, next_link).await
    }

    async fn set_role(&self, id: AccountId, role: Role) -> Result<()> {
        self.inner.set_role(id, role).await
    }

    async fn delete_by_email(&self, email: &str) -> Result<bool> {
        self.inner.delete_by_email(email).await
    }
}
