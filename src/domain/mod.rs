//! Domain primitives shared by the auth core and the storage layer.

pub mod id;

pub use id::AccountId;
