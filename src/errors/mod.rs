//! # Error Handling
//!
//! Error taxonomy for the accountplane core. See [`types`] for the variants and
//! their classification into transport-agnostic [`ErrorKind`]s.

pub mod types;

pub use types::{AccountplaneError, AuthErrorType, Error, ErrorKind, Result};
