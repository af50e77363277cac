//! Validation helpers for account-related requests.

use lazy_static::lazy_static;
use regex::Regex;
use validator::{Validate, ValidationError, ValidationErrors};

use super::account::{
    DeleteAccountRequest, LoginRequest, LogoutRequest, RegisterRequest, RestoreLinkRequest,
    RestorePasswordRequest, UpdateAccountRequest,
};

lazy_static! {
    // Email validation: basic RFC 5322 compliant pattern
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    )
    .expect("EMAIL_REGEX should be a valid regex pattern");
}

/// Maximum password length to bound hashing cost
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum full name length
const MAX_NAME_LENGTH: usize = 255;

/// Validate email format
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_email"))
    }
}

/// Validate a new password.
///
/// Any non-empty password up to 128 bytes is accepted; strength rules are
/// left to the client.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::new("password_empty"));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::new("password_too_long"));
    }

    Ok(())
}

/// Validate full name (non-blank, reasonable length)
pub fn validate_full_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::new("name_empty"));
    }

    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::new("name_too_long"));
    }

    Ok(())
}

fn finish(errors: ValidationErrors) -> Result<(), ValidationErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(err) = validate_email(&self.email) {
            errors.add("email", err);
        }

        if let Err(err) = validate_password(&self.password) {
            errors.add("password", err);
        }

        if let Err(err) = validate_full_name(&self.full_name) {
            errors.add("full_name", err);
        }

        finish(errors)
    }
}

impl Validate for UpdateAccountRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.is_empty() {
            errors.add("full_name", ValidationError::new("no_changes"));
        }

        if let Some(email) = &self.email {
            if let Err(err) = validate_email(email) {
                errors.add("email", err);
            }
        }

        if let Some(name) = &self.full_name {
            if let Err(err) = validate_full_name(name) {
                errors.add("full_name", err);
            }
        }

        finish(errors)
    }
}

// Login only checks presence; format errors would leak which emails are plausible.
impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.email.trim().is_empty() {
            errors.add("email", ValidationError::new("email_empty"));
        }

        if self.password.is_empty() {
            errors.add("password", ValidationError::new("password_empty"));
        }

        finish(errors)
    }
}

impl Validate for RestorePasswordRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(err) = validate_email(&self.email) {
            errors.add("email", err);
        }

        if self.activation_link.trim().is_empty() {
            errors.add("activation_link", ValidationError::new("activation_link_empty"));
        }

        if let Err(err) = validate_password(&self.new_password) {
            errors.add("new_password", err);
        }

        finish(errors)
    }
}

impl Validate for RestoreLinkRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(err) = validate_email(&self.email) {
            errors.add("email", err);
        }

        finish(errors)
    }
}

impl Validate for LogoutRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.token.trim().is_empty() {
            errors.add("token", ValidationError::new("token_empty"));
        }

        finish(errors)
    }
}

impl Validate for DeleteAccountRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.email.trim().is_empty() {
            errors.add("email", ValidationError::new("email_empty"));
        }

        finish(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(full_name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            full_name: full_name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("first.last+tag@example.co.uk").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("a@").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("pw1").is_ok());
        assert!(validate_password(&"a".repeat(128)).is_ok());

        let err = validate_password("").unwrap_err();
        assert_eq!(err.code, "password_empty");

        let err = validate_password(&"a".repeat(129)).unwrap_err();
        assert_eq!(err.code, "password_too_long");
    }

    #[test]
    fn test_validate_full_name() {
        assert!(validate_full_name("Alice").is_ok());
        assert!(validate_full_name("   ").is_err());
        assert!(validate_full_name(&"n".repeat(256)).is_err());
    }

    #[test]
    fn register_request_collects_all_fields() {
        assert!(register("Alice", "a@x.com", "pw1").validate().is_ok());

        let errors = register(" ", "bad", "").validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("full_name"));
    }

    #[test]
    fn update_request_needs_a_change() {
        assert!(UpdateAccountRequest::default().validate().is_err());

        let rename =
            UpdateAccountRequest { full_name: Some("Alice B".to_string()), email: None };
        assert!(rename.validate().is_ok());

        let bad_email = UpdateAccountRequest { full_name: None, email: Some("nope".to_string()) };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn login_request_only_checks_presence() {
        let ok = LoginRequest { email: "whatever".to_string(), password: "x".to_string() };
        assert!(ok.validate().is_ok());

        let empty = LoginRequest { email: String::new(), password: String::new() };
        let errors = empty.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 2);
    }

    #[test]
    fn restore_request_requires_link_and_password() {
        let request = RestorePasswordRequest {
            email: "a@x.com".to_string(),
            activation_link: String::new(),
            new_password: String::new(),
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("activation_link"));
        assert!(fields.contains_key("new_password"));
    }

    #[test]
    fn validation_errors_convert_to_domain_error() {
        let errors = register("Alice", "bad", "pw1").validate().unwrap_err();
        let err: crate::errors::Error = errors.into();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Validation);
        assert!(err.public_message().contains("email"));
    }
}
