//! # Observability Infrastructure
//!
//! Structured logging for the accountplane service. Metrics and trace export
//! are not part of this service; `tracing` spans and fields are.

pub mod logging;

pub use logging::{init_logging, log_config_info};
