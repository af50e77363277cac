//! JWT utilities for accountplane session tokens.
//!
//! Tokens are self-contained: validation needs only the signing secret and
//! never touches the account store. Revocation is layered on top by
//! [`crate::auth::access::AccessControl`].

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind as JwtErrorKind, Algorithm, DecodingKey, EncodingKey,
    Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::AuthConfig;
use crate::domain::AccountId;
use crate::errors::{AuthErrorType, Error, Result};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,   // Account identifier
    pub email: String, // Account email at issue time
    pub role: String,  // Account role for RBAC
    pub iss: String,   // Issuer
    pub iat: i64,      // Issued at time
    pub exp: i64,      // Expiration time
    pub jti: String,   // Unique token identifier
}

impl Claims {
    pub fn account_id(&self) -> std::result::Result<AccountId, TokenError> {
        self.sub.parse().map_err(|_| TokenError::Invalid(format!("bad subject '{}'", self.sub)))
    }

    pub fn role(&self) -> std::result::Result<Role, TokenError> {
        self.role.parse().map_err(|err: RoleParseError| TokenError::Invalid(err.to_string()))
    }
}

/// Account roles for RBAC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Whether a holder of `self` may perform an action that needs `required`.
    pub fn permits(&self, required: Role) -> bool {
        match required {
            Role::User => true,
            Role::Admin => *self == Role::Admin,
        }
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when role parsing fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid role: {0}")]
pub struct RoleParseError(pub String);

/// Reasons a token fails validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
}

impl From<TokenError> for Error {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => {
                Error::auth("Session token has expired", AuthErrorType::ExpiredToken)
            }
            TokenError::Invalid(_) => {
                Error::auth("Invalid session token", AuthErrorType::InvalidToken)
            }
        }
    }
}

/// Signs and verifies session tokens.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl: Duration,
}

impl TokenIssuer {
    /// Create a token issuer with the given secret, issuer claim and lifetime.
    pub fn new(secret: &[u8], issuer: impl Into<String>, ttl: Duration) -> Self {
        let issuer = issuer.into();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            issuer,
            ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let ttl = Duration::from_std(config.token_expiry())
            .map_err(|e| Error::config(format!("Invalid token expiry: {}", e)))?;
        Ok(Self::new(config.jwt_secret.as_bytes(), config.jwt_issuer.clone(), ttl))
    }

    /// Generate a signed token for the given account
    pub fn issue(&self, account_id: AccountId, role: Role, email: &str) -> Result<String> {
        let now = Utc::now();

        let claims = Claims {
            sub: account_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::internal(format!("Failed to sign session token: {}", e)))
    }

    /// Verify signature, issuer and expiry, then return the claims.
    pub fn validate(&self, token: &str) -> std::result::Result<Claims, TokenError> {
        let data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|err| {
                match err.kind() {
                    JwtErrorKind::ExpiredSignature => TokenError::Expired,
                    other => TokenError::Invalid(format!("{:?}", other)),
                }
            })?;

        let claims = data.claims;
        claims.account_id()?;
        claims.role()?;
        Ok(claims)
    }
}
