//! Account repository
//!
//! Persistence for accounts: lookups by the keys the session service needs,
//! insert with uniqueness checks, and removal. Every write touches only the
//! columns its operation owns, so a concurrent logout or login is never
//! overwritten by a stale copy of the row.

use crate::auth::account::{Account, NewAccount};
use crate::auth::jwt::Role;
use crate::domain::AccountId;
use crate::errors::{Error, Result};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::instrument;

const ACCOUNT_COLUMNS: &str = "id, full_name, email, password_hash, session_token, is_activated, activation_link, role, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
struct AccountRow {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub session_token: Option<String>,
    pub is_activated: bool,
    pub activation_link: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = Error;

    fn try_from(row: AccountRow) -> Result<Self> {
        let role: Role = row
            .role
            .parse()
            .map_err(|_| Error::internal(format!("Unknown account role '{}'", row.role)))?;

        Ok(Account {
            id: AccountId::new(row.id),
            full_name: row.full_name,
            email: row.email,
            password_hash: row.password_hash,
            session_token: row.session_token,
            is_activated: row.is_activated,
            activation_link: row.activation_link,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Storage contract for accounts. Email and activation link are unique.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// All accounts in id order
    async fn find_all(&self) -> Result<Vec<Account>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>>;

    async fn find_by_activation_link(&self, link: &str) -> Result<Option<Account>>;

    /// Insert a new account and return its assigned id.
    /// A duplicate email or activation link is a `Conflict`.
    async fn insert(&self, account: NewAccount) -> Result<AccountId>;

    /// Replace the stored session token. `None` revokes the session.
    async fn update_token(&self, id: AccountId, token: Option<&str>) -> Result<()>;

    /// Clear the session of whichever account holds `token`.
    /// Returns whether an account was affected.
    async fn clear_token_by_token(&self, token: &str) -> Result<bool>;

    /// Mark the account activated. Returns false if it already was.
    async fn set_activated(&self, id: AccountId) -> Result<bool>;

    /// Change name and email. A taken email is a `Conflict`.
    async fn update_profile(&self, id: AccountId, full_name: &str, email: &str) -> Result<()>;

    /// Swap in a new password hash, but only while `current_link` is still
    /// the account's link. The link is replaced by `next_link`, the session
    /// is revoked and the account counts as activated.
    /// Returns false if the link no longer matches.
    async fn replace_password(
        &self,
        id: AccountId,
        current_link: &str,
        password_hash: &str,
        next_link: &str,
    ) -> Result<bool>;

    async fn set_role(&self, id: AccountId, role: Role) -> Result<()>;

    /// Returns whether an account was removed.
    async fn delete_by_email(&self, email: &str) -> Result<bool>;
}

#[derive(Debug, Clone)]
pub struct SqlxAccountRepository {
    pool: DbPool,
}

impl SqlxAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by(
        &self,
        column: &str,
        value: &str,
        context: &str,
    ) -> Result<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE {} = $1", ACCOUNT_COLUMNS, column);
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| Error::database(err, context))?;

        row.map(Account::try_from).transpose()
    }
}

/// Map a unique-constraint failure to `Conflict`, anything else to a database error.
fn write_error(err: sqlx::Error, context: &str) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let message = db_err.message();
            if message.contains("accounts.email") {
                return Error::conflict("An account with this email already exists", "account");
            }
            if message.contains("accounts.activation_link") {
                return Error::conflict("Activation link already in use", "account");
            }
            return Error::conflict("Account already exists", "account");
        }
    }
    Error::database(err, context)
}

#[async_trait]
impl AccountRepository for SqlxAccountRepository {
    #[instrument(skip(self), name = "db_find_all_accounts")]
    async fn find_all(&self) -> Result<Vec<Account>> {
        let sql = format!("SELECT {} FROM accounts ORDER BY id", ACCOUNT_COLUMNS);
        let rows = sqlx::query_as::<_, AccountRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to list accounts"))?;

        rows.into_iter().map(Account::try_from).collect()
    }

    #[instrument(skip(self), fields(email = %email), name = "db_find_account_by_email")]
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.fetch_one_by("email", email, "Failed to fetch account by email").await
    }

    #[instrument(skip(self), fields(account_id = %id), name = "db_find_account_by_id")]
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to fetch account"))?;

        row.map(Account::try_from).transpose()
    }

    #[instrument(skip(self, link), name = "db_find_account_by_activation_link")]
    async fn find_by_activation_link(&self, link: &str) -> Result<Option<Account>> {
        self.fetch_one_by("activation_link", link, "Failed to fetch account by activation link")
            .await
    }

    #[instrument(skip(self, account), fields(email = %account.email), name = "db_insert_account")]
    async fn insert(&self, account: NewAccount) -> Result<AccountId> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (full_name, email, password_hash, session_token, is_activated, activation_link, role, created_at, updated_at)
            VALUES ($1, $2, $3, NULL, 0, $4, $5, $6, $7)
            "#,
        )
        .bind(&account.full_name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.activation_link)
        .bind(account.role.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|err| write_error(err, "Failed to create account"))?;

        Ok(AccountId::new(result.last_insert_rowid()))
    }

    #[instrument(skip(self, token), fields(account_id = %id, revoke = token.is_none()), name = "db_update_account_token")]
    async fn update_token(&self, id: AccountId, token: Option<&str>) -> Result<()> {
        let result = sqlx::query(
            "UPDATE accounts SET session_token = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(token)
        .bind(Utc::now())
        .bind(id.get())
        .execute(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to update session token"))?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("Account", id.to_string()));
        }

        Ok(())
    }

    #[instrument(skip(self, token), name = "db_clear_account_token")]
    async fn clear_token_by_token(&self, token: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET session_token = NULL, updated_at = $1 WHERE session_token = $2",
        )
        .bind(Utc::now())
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to clear session token"))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(account_id = %id), name = "db_activate_account")]
    async fn set_activated(&self, id: AccountId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET is_activated = 1, updated_at = $1 WHERE id = $2 AND is_activated = 0",
        )
        .bind(Utc::now())
        .bind(id.get())
        .execute(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to activate account"))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, full_name), fields(account_id = %id, email = %email), name = "db_update_account_profile")]
    async fn update_profile(&self, id: AccountId, full_name: &str, email: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE accounts SET full_name = $1, email = $2, updated_at = $3 WHERE id = $4",
        )
        .bind(full_name)
        .bind(email)
        .bind(Utc::now())
        .bind(id.get())
        .execute(&self.pool)
        .await
        .map_err(|err| write_error(err, "Failed to update account profile"))?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("Account", id.to_string()));
        }

        Ok(())
    }

    #[instrument(
        skip(self, current_link, password_hash, next_link),
        fields(account_id = %id),
        name = "db_replace_account_password"
    )]
    async fn replace_password(
        &self,
        id: AccountId,
        current_link: &str,
        password_hash: &str,
        next_link: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET password_hash = $1, activation_link = $2, session_token = NULL,
                is_activated = 1, updated_at = $3
            WHERE id = $4 AND activation_link = $5
            "#,
        )
        .bind(password_hash)
        .bind(next_link)
        .bind(Utc::now())
        .bind(id.get())
        .bind(current_link)
        .execute(&self.pool)
        .await
        .map_err(|err| write_error(err, "Failed to replace password"))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(account_id = %id, role = %role), name = "db_set_account_role")]
    async fn set_role(&self, id: AccountId, role: Role) -> Result<()> {
        let result = sqlx::query("UPDATE accounts SET role = $1, updated_at = $2 WHERE id = $3")
            .bind(role.as_str())
            .bind(Utc::now())
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to change account role"))?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("Account", id.to_string()));
        }

        Ok(())
    }

    #[instrument(skip(self), fields(email = %email), name = "db_delete_account")]
    async fn delete_by_email(&self, email: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to delete account"))?;

        Ok(result.rows_affected() > 0)
    }
}
