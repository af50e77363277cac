//! # REST API Components
//!
//! Axum transport over the session services: routing, auth middleware wiring,
//! and the mapping from error kinds to HTTP status codes.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::{build_router, ApiState};
pub use server::start_api_server;
