//! Session service: registration, login, logout, profile changes and password
//! restore.
//!
//! Every operation validates its input, then works through the account store,
//! the password hasher, the token issuer and the notifier. Failures come back
//! as classified [`Error`]s; nothing here knows about HTTP.

use std::sync::{Arc, LazyLock};

use subtle::ConstantTimeEq;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::auth::account::{
    AccountView, LoginRequest, NewAccount, RegisterRequest, RestorePasswordRequest,
    UpdateAccountRequest,
};
use crate::auth::activation::{activation_url, generate_activation_link};
use crate::auth::hashing;
use crate::auth::jwt::{Role, TokenIssuer};
use crate::config::AuthConfig;
use crate::domain::AccountId;
use crate::errors::{AuthErrorType, Error, Result};
use crate::notify::Notifier;
use crate::storage::AccountRepository;

/// Login failures share this message whether or not the email exists.
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Verified against when the email is unknown, so both failure paths cost one Argon2 run.
static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| {
    hashing::hash_password("dummy_startup_value").unwrap_or_else(|_| {
        "$argon2id$v=19$m=768,t=1,p=1$ZHVtbXlzYWx0dmFsdWU$3q2+7w0Jv1tn2nG1gq8h9gQFdmQe6v5q3zv1mX1m0kA"
            .to_string()
    })
});

fn invalid_credentials() -> Error {
    Error::auth(INVALID_CREDENTIALS, AuthErrorType::InvalidCredentials)
}

fn invalid_restore_link() -> Error {
    Error::auth("Invalid password restore link", AuthErrorType::InvalidCredentials)
}

#[derive(Clone)]
pub struct SessionService {
    repository: Arc<dyn AccountRepository>,
    notifier: Arc<dyn Notifier>,
    issuer: Arc<TokenIssuer>,
    auth: Arc<AuthConfig>,
    api_base_url: String,
}

impl SessionService {
    pub fn new(
        repository: Arc<dyn AccountRepository>,
        notifier: Arc<dyn Notifier>,
        issuer: Arc<TokenIssuer>,
        auth: Arc<AuthConfig>,
        api_base_url: impl Into<String>,
    ) -> Self {
        Self { repository, notifier, issuer, auth, api_base_url: api_base_url.into() }
    }

    /// Create an inactive account, mail its activation link, and sign it in.
    ///
    /// Returns the new session token. A failed activation mail is logged and
    /// does not undo the registration.
    #[instrument(skip(self, request), fields(email = %request.email), name = "register_account")]
    pub async fn register(&self, request: RegisterRequest) -> Result<String> {
        request.validate()?;

        if self.repository.find_by_email(&request.email).await?.is_some() {
            return Err(Error::conflict("An account with this email already exists", "account"));
        }

        let role = if self.auth.is_admin_email(&request.email) { Role::Admin } else { Role::User };
        let activation_link = generate_activation_link();

        let id = self
            .repository
            .insert(NewAccount {
                full_name: request.full_name.trim().to_string(),
                email: request.email.clone(),
                password_hash: hashing::hash_password(&request.password)?,
                activation_link: activation_link.clone(),
                role,
            })
            .await?;

        let url = activation_url(&self.api_base_url, &activation_link);
        if let Err(e) = self.notifier.send_activation_email(&request.email, &url).await {
            warn!(account_id = %id, error = %e, "Failed to send activation mail");
        }

        let token = self.issuer.issue(id, role, &request.email)?;
        self.repository.update_token(id, Some(&token)).await?;

        info!(account_id = %id, role = %role, "Account registered");
        Ok(token)
    }

    /// Check credentials and start a new session, replacing any previous one.
    #[instrument(skip(self, request), fields(email = %request.email), name = "login")]
    pub async fn login(&self, request: LoginRequest) -> Result<(String, AccountView)> {
        request.validate()?;

        let account = match self.repository.find_by_email(&request.email).await? {
            Some(account) => account,
            None => {
                if let Err(e) = hashing::verify_password(&request.password, &DUMMY_HASH) {
                    warn!(error = %e, "dummy hash verification failed unexpectedly");
                }
                warn!("login attempt for non-existent account");
                return Err(invalid_credentials());
            }
        };

        if !hashing::verify_password(&request.password, &account.password_hash)? {
            warn!(account_id = %account.id, "login attempt with incorrect password");
            return Err(invalid_credentials());
        }

        let token = self.issuer.issue(account.id, account.role, &account.email)?;
        self.repository.update_token(account.id, Some(&token)).await?;

        info!(account_id = %account.id, "Login succeeded");
        Ok((token, account.view()))
    }

    /// End the session that `token` belongs to.
    ///
    /// The token must verify and must still be the stored session; a second
    /// logout with the same token is `Unauthorized`.
    #[instrument(skip(self, token), name = "logout")]
    pub async fn logout(&self, token: &str) -> Result<()> {
        let claims = self.issuer.validate(token)?;

        if !self.repository.clear_token_by_token(token).await? {
            return Err(Error::auth("Session is no longer active", AuthErrorType::RevokedToken));
        }

        info!(account_id = %claims.sub, "Logged out");
        Ok(())
    }

    /// Change the caller's own profile fields.
    #[instrument(skip(self, request), fields(account_id = %account_id), name = "update_account")]
    pub async fn update_account(
        &self,
        account_id: AccountId,
        request: UpdateAccountRequest,
    ) -> Result<AccountView> {
        request.validate()?;

        let mut account = self
            .repository
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| Error::not_found("Account", account_id.to_string()))?;

        if let Some(email) = request.email {
            if email != account.email {
                if let Some(other) = self.repository.find_by_email(&email).await? {
                    if other.id != account.id {
                        return Err(Error::conflict(
                            "An account with this email already exists",
                            "account",
                        ));
                    }
                }
                account.email = email;
            }
        }

        if let Some(full_name) = request.full_name {
            account.full_name = full_name.trim().to_string();
        }

        self.repository.update_profile(account.id, &account.full_name, &account.email).await?;
        Ok(account.view())
    }

    /// Permanently remove the account registered under `email`.
    #[instrument(skip(self), fields(email = %email), name = "delete_account")]
    pub async fn delete_account(&self, email: &str) -> Result<()> {
        if !self.repository.delete_by_email(email).await? {
            return Err(Error::not_found("Account", email));
        }

        info!("Account deleted");
        Ok(())
    }

    /// Set a new password after proving ownership with the activation link.
    ///
    /// The link is single use: a successful restore replaces it, clears the
    /// stored session and marks the account activated.
    #[instrument(skip(self, request), fields(email = %request.email), name = "restore_password")]
    pub async fn restore_password(&self, request: RestorePasswordRequest) -> Result<()> {
        request.validate()?;

        let account = self
            .repository
            .find_by_email(&request.email)
            .await?
            .ok_or_else(|| Error::not_found("Account", request.email.as_str()))?;

        let proof_matches: bool =
            account.activation_link.as_bytes().ct_eq(request.activation_link.as_bytes()).into();
        if !proof_matches {
            warn!(account_id = %account.id, "password restore with wrong proof");
            return Err(invalid_restore_link());
        }

        let password_hash = hashing::hash_password(&request.new_password)?;
        let replaced = self
            .repository
            .replace_password(
                account.id,
                &account.activation_link,
                &password_hash,
                &generate_activation_link(),
            )
            .await?;
        if !replaced {
            warn!(account_id = %account.id, "restore link changed before the write");
            return Err(invalid_restore_link());
        }

        info!(account_id = %account.id, "Password restored");
        Ok(())
    }

    /// Mail the restore proof to `email`. Unknown addresses succeed silently.
    #[instrument(skip(self), fields(email = %email), name = "request_password_restore")]
    pub async fn request_password_restore(&self, email: &str) -> Result<()> {
        let Some(account) = self.repository.find_by_email(email).await? else {
            debug!("password restore requested for unknown email");
            return Ok(());
        };

        if let Err(e) =
            self.notifier.send_password_restore_email(&account.email, &account.activation_link).await
        {
            warn!(account_id = %account.id, error = %e, "Failed to send password restore mail");
        }

        Ok(())
    }

    /// Every account as a public view. Callers check access first.
    pub async fn list_accounts(&self) -> Result<Vec<AccountView>> {
        let accounts = self.repository.find_all().await?;
        Ok(accounts.iter().map(|account| account.view()).collect())
    }

    pub async fn account(&self, account_id: AccountId) -> Result<AccountView> {
        self.repository
            .find_by_id(account_id)
            .await?
            .map(|account| account.view())
            .ok_or_else(|| Error::not_found("Account", account_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::notify::testing::{RecordingNotifier, Sent};
    use crate::storage::test_helpers::{memory_pool, LogoutAfterReadRepository};
    use crate::storage::SqlxAccountRepository;
    use chrono::Duration;
    use tracing_test::traced_test;

    const SECRET: &[u8] = b"session-service-test-secret-0123456789";

    struct Fixture {
        service: SessionService,
        repository: Arc<SqlxAccountRepository>,
        notifier: Arc<RecordingNotifier>,
        issuer: Arc<TokenIssuer>,
    }

    async fn fixture_with(notifier: RecordingNotifier) -> Fixture {
        let repository = Arc::new(SqlxAccountRepository::new(memory_pool().await));
        let notifier = Arc::new(notifier);
        let issuer = Arc::new(TokenIssuer::new(SECRET, "accountplane", Duration::hours(1)));
        let auth = Arc::new(AuthConfig {
            admin_emails: vec!["root@x.com".to_string()],
            ..Default::default()
        });
        let service = SessionService::new(
            repository.clone(),
            notifier.clone(),
            issuer.clone(),
            auth,
            "http://api.test",
        );
        Fixture { service, repository, notifier, issuer }
    }

    async fn fixture() -> Fixture {
        fixture_with(RecordingNotifier::default()).await
    }

    fn register(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            full_name: "Alice".to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest { email: email.to_string(), password: password.to_string() }
    }

    #[tokio::test]
    async fn register_creates_inactive_account_with_session() {
        let f = fixture().await;

        let token = f.service.register(register("a@x.com", "pw1")).await.unwrap();

        let account = f.repository.find_by_email("a@x.com").await.unwrap().unwrap();
        assert!(!account.is_activated);
        assert_eq!(account.role, Role::User);
        assert_eq!(account.session_token.as_deref(), Some(token.as_str()));
        assert_ne!(account.password_hash, "pw1");

        let claims = f.issuer.validate(&token).unwrap();
        assert_eq!(claims.account_id().unwrap(), account.id);

        assert_eq!(
            f.notifier.sent(),
            vec![Sent::Activation {
                email: "a@x.com".to_string(),
                url: format!("http://api.test/api/v1/activate/{}", account.activation_link),
            }]
        );
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts_and_keeps_first() {
        let f = fixture().await;
        let first = f.service.register(register("a@x.com", "pw1")).await.unwrap();

        let err = f.service.register(register("a@x.com", "other")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let account = f.repository.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(account.session_token.as_deref(), Some(first.as_str()));
        assert!(f.service.login(login("a@x.com", "pw1")).await.is_ok());
        assert_eq!(f.service.list_accounts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn register_rejects_malformed_input() {
        let f = fixture().await;

        let err = f.service.register(register("not-an-email", "pw1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = f.service.register(register("a@x.com", "")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert!(f.service.list_accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn notifier_failure_does_not_fail_registration() {
        let f = fixture_with(RecordingNotifier::failing()).await;

        let token = f.service.register(register("a@x.com", "pw1")).await.unwrap();
        assert!(!token.is_empty());
        assert_eq!(f.notifier.sent().len(), 1);
        assert!(f.repository.find_by_email("a@x.com").await.unwrap().is_some());
        assert!(logs_contain("Failed to send activation mail"));
    }

    #[tokio::test]
    async fn configured_admin_email_gets_admin_role() {
        let f = fixture().await;
        let token = f.service.register(register("root@x.com", "pw1")).await.unwrap();

        let claims = f.issuer.validate(&token).unwrap();
        assert_eq!(claims.role().unwrap(), Role::Admin);
    }

    #[tokio::test]
    async fn login_replaces_session_token() {
        let f = fixture().await;
        let first = f.service.register(register("a@x.com", "pw1")).await.unwrap();

        let (second, view) = f.service.login(login("a@x.com", "pw1")).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(view.email, "a@x.com");

        let account = f.repository.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(account.session_token.as_deref(), Some(second.as_str()));
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let f = fixture().await;
        f.service.register(register("a@x.com", "pw1")).await.unwrap();

        let wrong_password = f.service.login(login("a@x.com", "nope")).await.unwrap_err();
        let unknown_email = f.service.login(login("b@x.com", "pw1")).await.unwrap_err();

        assert_eq!(wrong_password.to_pair(), unknown_email.to_pair());
        assert_eq!(wrong_password.kind(), ErrorKind::Unauthorized);
        assert_eq!(wrong_password.public_message(), INVALID_CREDENTIALS);
    }

    #[tokio::test]
    async fn logout_clears_session_once() {
        let f = fixture().await;
        let token = f.service.register(register("a@x.com", "pw1")).await.unwrap();

        f.service.logout(&token).await.unwrap();
        let account = f.repository.find_by_email("a@x.com").await.unwrap().unwrap();
        assert!(account.session_token.is_none());

        let err = f.service.logout(&token).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let err = f.service.logout("garbage").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn superseded_token_cannot_log_out() {
        let f = fixture().await;
        let stale = f.service.register(register("a@x.com", "pw1")).await.unwrap();
        let (current, _) = f.service.login(login("a@x.com", "pw1")).await.unwrap();

        let err = f.service.logout(&stale).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let account = f.repository.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(account.session_token.as_deref(), Some(current.as_str()));
    }

    #[tokio::test]
    async fn update_account_changes_profile() {
        let f = fixture().await;
        f.service.register(register("a@x.com", "pw1")).await.unwrap();
        f.service.register(register("b@x.com", "pw1")).await.unwrap();
        let id = f.repository.find_by_email("a@x.com").await.unwrap().unwrap().id;

        let view = f
            .service
            .update_account(
                id,
                UpdateAccountRequest {
                    full_name: Some("Alice B".to_string()),
                    email: Some("alice@x.com".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(view.full_name, "Alice B");
        assert_eq!(view.email, "alice@x.com");
        assert!(f.service.login(login("alice@x.com", "pw1")).await.is_ok());

        let taken = UpdateAccountRequest { full_name: None, email: Some("b@x.com".to_string()) };
        let err = f.service.update_account(id, taken).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = f.service.update_account(id, UpdateAccountRequest::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let rename = UpdateAccountRequest { full_name: Some("X".to_string()), email: None };
        let err = f.service.update_account(AccountId::new(999), rename).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn logout_during_profile_update_stays_logged_out() {
        let f = fixture().await;
        let token = f.service.register(register("a@x.com", "pw1")).await.unwrap();
        let id = f.repository.find_by_email("a@x.com").await.unwrap().unwrap().id;

        let racing = Arc::new(LogoutAfterReadRepository { inner: f.repository.clone() });
        let service = SessionService::new(
            racing,
            f.notifier.clone(),
            f.issuer.clone(),
            Arc::new(AuthConfig::default()),
            "http://api.test",
        );
        let rename = UpdateAccountRequest { full_name: Some("Alice B".to_string()), email: None };
        service.update_account(id, rename).await.unwrap();

        let stored = f.repository.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.full_name, "Alice B");
        assert!(stored.session_token.is_none());
        assert!(!stored.holds_session(&token));
    }

    #[tokio::test]
    async fn delete_account_is_permanent() {
        let f = fixture().await;
        f.service.register(register("a@x.com", "pw1")).await.unwrap();

        f.service.delete_account("a@x.com").await.unwrap();
        assert!(f.repository.find_by_email("a@x.com").await.unwrap().is_none());

        let err = f.service.delete_account("a@x.com").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = f.service.login(login("a@x.com", "pw1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn restore_password_requires_activation_link() {
        let f = fixture().await;
        f.service.register(register("a@x.com", "pw1")).await.unwrap();
        let account = f.repository.find_by_email("a@x.com").await.unwrap().unwrap();

        let wrong = RestorePasswordRequest {
            email: "a@x.com".to_string(),
            activation_link: "not-the-link".to_string(),
            new_password: "pw2".to_string(),
        };
        let err = f.service.restore_password(wrong).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let unknown = RestorePasswordRequest {
            email: "b@x.com".to_string(),
            activation_link: account.activation_link.clone(),
            new_password: "pw2".to_string(),
        };
        let err = f.service.restore_password(unknown).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let valid = RestorePasswordRequest {
            email: "a@x.com".to_string(),
            activation_link: account.activation_link.clone(),
            new_password: "pw2".to_string(),
        };
        f.service.restore_password(valid).await.unwrap();

        let stored = f.repository.find_by_email("a@x.com").await.unwrap().unwrap();
        assert!(stored.session_token.is_none());
        assert_ne!(stored.activation_link, account.activation_link);
        assert!(f.service.login(login("a@x.com", "pw1")).await.is_err());
        assert!(f.service.login(login("a@x.com", "pw2")).await.is_ok());

        let replay = RestorePasswordRequest {
            email: "a@x.com".to_string(),
            activation_link: account.activation_link.clone(),
            new_password: "pw3".to_string(),
        };
        let err = f.service.restore_password(replay).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn restore_request_mails_known_accounts_only() {
        let f = fixture().await;
        f.service.register(register("a@x.com", "pw1")).await.unwrap();
        let link = f.repository.find_by_email("a@x.com").await.unwrap().unwrap().activation_link;

        f.service.request_password_restore("a@x.com").await.unwrap();
        f.service.request_password_restore("nobody@x.com").await.unwrap();

        let restores: Vec<_> = f
            .notifier
            .sent()
            .into_iter()
            .filter(|sent| matches!(sent, Sent::Restore { .. }))
            .collect();
        assert_eq!(restores, vec![Sent::Restore { email: "a@x.com".to_string(), link }]);
    }

    #[tokio::test]
    async fn list_and_lookup_return_views() {
        let f = fixture().await;
        f.service.register(register("a@x.com", "pw1")).await.unwrap();
        f.service.register(register("b@x.com", "pw1")).await.unwrap();

        let views = f.service.list_accounts().await.unwrap();
        let emails: Vec<_> = views.iter().map(|v| v.email.as_str()).collect();
        assert_eq!(emails, vec!["a@x.com", "b@x.com"]);

        let view = f.service.account(views[1].id).await.unwrap();
        assert_eq!(view, views[1]);

        let err = f.service.account(AccountId::new(999)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
