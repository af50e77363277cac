//! Authentication and session lifecycle.
//!
//! Password hashing, signed session tokens, activation links, the session
//! service that ties them to the account store, and access control.

pub mod access;
pub mod account;
pub mod account_validation;
pub mod activation;
pub mod hashing;
pub mod jwt;
pub mod middleware;
pub mod session_service;

pub use access::{bearer_token, require_role, AccessControl};
pub use account::{
    Account, AccountView, DeleteAccountRequest, LoginRequest, LoginResponse, LogoutRequest,
    NewAccount, RegisterRequest, RegisterResponse, RestoreLinkRequest, RestorePasswordRequest,
    UpdateAccountRequest,
};
pub use activation::{activation_url, generate_activation_link, ActivationService};
pub use jwt::{Claims, Role, TokenError, TokenIssuer};
pub use session_service::SessionService;
