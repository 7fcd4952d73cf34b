//! # Metrics Collection
//!
//! Counters and histograms for secret operations, recorded through the
//! `metrics` facade. Nothing is exported unless the host process installs
//! a recorder.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use once_cell::sync::OnceCell;
use std::time::Duration;

static DESCRIBED: OnceCell<()> = OnceCell::new();

/// Records secret manager activity
#[derive(Debug, Clone, Default)]
pub struct SecretMetrics;

impl SecretMetrics {
    /// Create a new recorder handle; metric descriptions are registered once
    pub fn new() -> Self {
        DESCRIBED.get_or_init(register_secret_metrics);
        Self
    }

    /// Record the outcome and latency of a manager operation
    pub fn record_operation(&self, operation: &'static str, outcome: &'static str, elapsed: Duration) {
        counter!("secret_operations_total", "operation" => operation, "outcome" => outcome)
            .increment(1);
        histogram!("secret_operation_duration_seconds", "operation" => operation)
            .record(elapsed.as_secs_f64());
    }

    /// Record a cache lookup for the given key kind
    pub fn record_cache_lookup(&self, key: &'static str, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        counter!("secret_cache_lookups_total", "key" => key, "result" => result).increment(1);
    }

    /// Record a cache invalidation for the given key kind
    pub fn record_cache_invalidation(&self, key: &'static str) {
        counter!("secret_cache_invalidations_total", "key" => key).increment(1);
    }
}

/// Outcome label for an operation result
pub fn outcome_label<T>(result: &crate::errors::Result<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) if e.is_client() => "client_error",
        Err(_) => "server_error",
    }
}

fn register_secret_metrics() {
    describe_counter!(
        "secret_operations_total",
        Unit::Count,
        "Secret manager operations by operation and outcome"
    );
    describe_histogram!(
        "secret_operation_duration_seconds",
        Unit::Seconds,
        "Secret manager operation latency"
    );
    describe_counter!(
        "secret_cache_lookups_total",
        Unit::Count,
        "Secret cache lookups by key kind and result"
    );
    describe_counter!(
        "secret_cache_invalidations_total",
        Unit::Count,
        "Secret cache invalidations by key kind"
    );
}
