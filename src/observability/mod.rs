//! # Observability Infrastructure
//!
//! Structured logging and metrics for the secret manager.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, log_config_info};
pub use metrics::SecretMetrics;
