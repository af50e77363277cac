//! Account domain models and data structures.
//!
//! This module defines the stored account record, its public projection,
//! and the plain-value requests accepted by the session service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::jwt::Role;
use crate::domain::AccountId;

/// Stored representation of an account.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub session_token: Option<String>,
    pub is_activated: bool,
    pub activation_link: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Project to the fields that may leave the service.
    pub fn view(&self) -> AccountView {
        AccountView {
            id: self.id,
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            is_activated: self.is_activated,
            role: self.role,
        }
    }

    /// Whether `token` is the session currently stored for this account.
    pub fn holds_session(&self, token: &str) -> bool {
        matches!(self.session_token.as_deref(), Some(stored) if !stored.is_empty() && stored == token)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("is_activated", &self.is_activated)
            .field("role", &self.role)
            .finish()
    }
}

/// Read-only account projection. Never carries the hash or the raw token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: AccountId,
    pub full_name: String,
    pub email: String,
    pub is_activated: bool,
    pub role: Role,
}

/// New account insert payload. Accounts start inactive and without a session.
#[derive(Clone)]
pub struct NewAccount {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub activation_link: String,
    pub role: Role,
}

/// Request to register a new account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

/// Account credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Self-service profile update. Only present fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

impl UpdateAccountRequest {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.email.is_none()
    }
}

/// Password reset, proven by the activation link mailed to the account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorePasswordRequest {
    pub email: String,
    pub activation_link: String,
    pub new_password: String,
}

/// Request for a password restore mail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreLinkRequest {
    pub email: String,
}

/// Logout carries the token in the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub token: String,
}

/// Delete by email.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountRequest {
    pub email: String,
}

/// Successful registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub token: String,
}

/// Successful login: the new token plus the account projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub account: AccountView,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account {
            id: AccountId::new(1),
            full_name: "Alice".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            session_token: Some("token-1".to_string()),
            is_activated: false,
            activation_link: "link-1".to_string(),
            role: Role::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn view_drops_secrets() {
        let view = account().view();
        let json = serde_json::to_string(&view).unwrap();

        assert!(json.contains("\"fullName\":\"Alice\""));
        assert!(json.contains("\"isActivated\":false"));
        assert!(json.contains("\"role\":\"user\""));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("token-1"));
        assert!(!json.contains("link-1"));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let rendered = format!("{:?}", account());
        assert!(!rendered.contains("$argon2id$secret"));
        assert!(!rendered.contains("token-1"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn holds_session_requires_exact_non_empty_match() {
        let mut account = account();
        assert!(account.holds_session("token-1"));
        assert!(!account.holds_session("token-2"));

        account.session_token = Some(String::new());
        assert!(!account.holds_session(""));

        account.session_token = None;
        assert!(!account.holds_session("token-1"));
    }

    #[test]
    fn update_request_partial() {
        let request: UpdateAccountRequest =
            serde_json::from_str(r#"{ "fullName": "Alice B" }"#).unwrap();
        assert_eq!(request.full_name.as_deref(), Some("Alice B"));
        assert!(request.email.is_none());
        assert!(!request.is_empty());
        assert!(UpdateAccountRequest::default().is_empty());
    }

    #[test]
    fn restore_request_deserialization() {
        let request: RestorePasswordRequest = serde_json::from_str(
            r#"{ "email": "a@x.com", "activationLink": "abc", "newPassword": "pw2" }"#,
        )
        .unwrap();
        assert_eq!(request.activation_link, "abc");
        assert_eq!(request.new_password, "pw2");
    }
}
