//! Access decisions from a presented session token.
//!
//! A token grants access only while it verifies and is still the session
//! stored for its account, so logout and re-login revoke it server side.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::auth::jwt::{Claims, Role, TokenIssuer};
use crate::errors::{AuthErrorType, Error, Result};
use crate::storage::AccountRepository;

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Result<&str> {
    let token = header
        .strip_prefix(BEARER_PREFIX)
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    token.ok_or_else(|| Error::auth("Missing bearer token", AuthErrorType::MissingToken))
}

/// Pure role check on already authenticated claims.
pub fn require_role(claims: &Claims, required: Role) -> Result<()> {
    let role = claims.role()?;
    if role.permits(required) {
        Ok(())
    } else {
        Err(Error::forbidden(format!("This operation requires the {} role", required)))
    }
}

#[derive(Clone)]
pub struct AccessControl {
    issuer: Arc<TokenIssuer>,
    repository: Arc<dyn AccountRepository>,
}

impl AccessControl {
    pub fn new(issuer: Arc<TokenIssuer>, repository: Arc<dyn AccountRepository>) -> Self {
        Self { issuer, repository }
    }

    /// Verify `token` and confirm it is the live session of its account.
    #[instrument(skip(self, token), name = "authenticate_token")]
    pub async fn authenticate(&self, token: &str) -> Result<Claims> {
        let claims = self.issuer.validate(token)?;
        let account_id = claims.account_id()?;

        let account = self.repository.find_by_id(account_id).await?;
        match account {
            Some(account) if account.holds_session(token) => Ok(claims),
            Some(_) => {
                debug!(account_id = %account_id, "token is not the stored session");
                Err(Error::auth("Session is no longer active", AuthErrorType::RevokedToken))
            }
            None => {
                debug!(account_id = %account_id, "token subject no longer exists");
                Err(Error::auth("Session is no longer active", AuthErrorType::RevokedToken))
            }
        }
    }

    /// [`Self::authenticate`], then require `required` of the token's role.
    pub async fn check_access(&self, token: &str, required: Role) -> Result<Claims> {
        let claims = self.authenticate(token).await?;
        require_role(&claims, required)?;
        Ok(claims)
    }
}
