//! # Error Types
//!
//! Error types for the accountplane core using `thiserror`.
//!
//! Every error classifies into one [`ErrorKind`]. The transport adapter maps a
//! kind to its protocol status and renders [`AccountplaneError::public_message`];
//! nothing in this module knows about HTTP.

use std::fmt;

/// Custom result type for accountplane operations
pub type Result<T> = std::result::Result<T, AccountplaneError>;

/// Main error type for the accountplane service
#[derive(thiserror::Error, Debug)]
pub enum AccountplaneError {
    /// Malformed caller input
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Uniqueness violation
    #[error("Resource conflict: {message}")]
    Conflict { message: String, resource_type: String },

    /// Bad credentials or an invalid, expired, or revoked token
    #[error("Authentication error: {message}")]
    Auth { message: String, error_type: AuthErrorType },

    /// Valid identity without the privilege the operation needs
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Entity absent
    #[error("Resource not found: {resource_type} with ID '{id}'")]
    NotFound { resource_type: String, id: String },

    /// Database and storage errors
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Outbound notification delivery failed
    #[error("Notification error: {message}")]
    Notification { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Internal server errors
    #[error("Internal server error: {message}")]
    Internal { message: String },
}

/// Shorthand used across the crate.
pub type Error = AccountplaneError;

/// Abstract failure classes handed to the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Unauthorized,
    Forbidden,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication error subtypes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorType {
    InvalidCredentials,
    InvalidToken,
    ExpiredToken,
    MissingToken,
    RevokedToken,
}

impl fmt::Display for AuthErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthErrorType::InvalidCredentials => write!(f, "invalid_credentials"),
            AuthErrorType::InvalidToken => write!(f, "invalid_token"),
            AuthErrorType::ExpiredToken => write!(f, "expired_token"),
            AuthErrorType::MissingToken => write!(f, "missing_token"),
            AuthErrorType::RevokedToken => write!(f, "revoked_token"),
        }
    }
}

impl AccountplaneError {
    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a conflict error
    pub fn conflict<M: Into<String>, R: Into<String>>(message: M, resource_type: R) -> Self {
        Self::Conflict { message: message.into(), resource_type: resource_type.into() }
    }

    /// Create an authentication error
    pub fn auth<S: Into<String>>(message: S, error_type: AuthErrorType) -> Self {
        Self::Auth { message: message.into(), error_type }
    }

    /// Create a forbidden error
    pub fn forbidden<S: Into<String>>(message: S) -> Self {
        Self::Forbidden { message: message.into() }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, id: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), id: id.into() }
    }

    /// Wrap a sqlx error with context
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database { source, context: context.into() }
    }

    /// Create a notification error
    pub fn notification<S: Into<String>>(message: S) -> Self {
        Self::Notification { message: message.into() }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create an internal server error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Classify this error for the transport layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Auth { .. } => ErrorKind::Unauthorized,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Database { .. }
            | Self::Notification { .. }
            | Self::Config { .. }
            | Self::Io { .. }
            | Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Message that is safe to show to the caller.
    ///
    /// Internal failures collapse to a fixed string; their details belong in
    /// logs only.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation { message, .. }
            | Self::Conflict { message, .. }
            | Self::Auth { message, .. }
            | Self::Forbidden { message } => message.clone(),
            Self::NotFound { resource_type, .. } => format!("{} not found", resource_type),
            _ => "Internal server error".to_string(),
        }
    }

    /// Kind and caller-safe message as one pair.
    pub fn to_pair(&self) -> (ErrorKind, String) {
        (self.kind(), self.public_message())
    }
}

impl From<sqlx::Error> for AccountplaneError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<std::io::Error> for AccountplaneError {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<validator::ValidationErrors> for AccountplaneError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let first_field = fields.first().map(|(field, _)| field.to_string());
        let message = fields
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map_or_else(|| e.code.to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::Validation { message: format!("Validation failed: {}", message), field: first_field }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = AccountplaneError::config("missing secret");
        assert!(matches!(error, AccountplaneError::Config { .. }));
        assert_eq!(error.to_string(), "Configuration error: missing secret");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Error::validation("x").kind(), ErrorKind::Validation);
        assert_eq!(Error::conflict("x", "account").kind(), ErrorKind::Conflict);
        assert_eq!(
            Error::auth("x", AuthErrorType::InvalidToken).kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(Error::forbidden("x").kind(), ErrorKind::Forbidden);
        assert_eq!(Error::not_found("Account", "1").kind(), ErrorKind::NotFound);
        assert_eq!(Error::notification("smtp down").kind(), ErrorKind::Internal);
        assert_eq!(Error::internal("boom").kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_public_message_hides_internal_details() {
        let error = Error::database(sqlx::Error::PoolTimedOut, "Failed to fetch account");
        assert_eq!(error.public_message(), "Internal server error");

        let error = Error::auth("Invalid email or password", AuthErrorType::InvalidCredentials);
        assert_eq!(
            error.to_pair(),
            (ErrorKind::Unauthorized, "Invalid email or password".to_string())
        );

        assert_eq!(Error::not_found("Account", "42").public_message(), "Account not found");
    }

    #[test]
    fn test_io_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: AccountplaneError = io_error.into();
        assert!(matches!(error, AccountplaneError::Io { .. }));
        assert_eq!(error.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_auth_error_type_display() {
        assert_eq!(AuthErrorType::InvalidToken.to_string(), "invalid_token");
        assert_eq!(AuthErrorType::ExpiredToken.to_string(), "expired_token");
        assert_eq!(AuthErrorType::RevokedToken.to_string(), "revoked_token");
        assert_eq!(AuthErrorType::InvalidCredentials.to_string(), "invalid_credentials");
    }
}
