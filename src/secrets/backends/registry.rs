//! Secret backend registry
//!
//! Holds the ordered list of backends known to the manager. Priority is
//! list position: the backend supplied last is the backend of record for
//! every operation. The list is fixed at construction.

use super::backend::SecretBackend;
use crate::errors::{ErrorMessage, Result, SecretManagementError};
use std::sync::Arc;
use tracing::{info, warn};

/// Ordered, immutable collection of secret backends
#[derive(Debug, Clone)]
pub struct SecretBackendRegistry {
    backends: Arc<[Arc<dyn SecretBackend>]>,
}

impl Default for SecretBackendRegistry {
    fn default() -> Self {
        Self { backends: Arc::from(Vec::new()) }
    }
}

impl SecretBackendRegistry {
    /// Create a registry from backends in ascending priority order
    pub fn new(backends: Vec<Arc<dyn SecretBackend>>) -> Self {
        for backend in &backends {
            info!(backend = backend.name(), "Registering secret backend");
        }
        Self { backends: backends.into() }
    }

    /// Create a registry holding a single backend
    pub fn single(backend: Arc<dyn SecretBackend>) -> Self {
        Self::new(vec![backend])
    }

    /// Resolve the backend to use for the current call
    pub fn select(&self) -> Result<Arc<dyn SecretBackend>> {
        self.backends.last().cloned().ok_or_else(|| {
            warn!("No secret backend registered");
            SecretManagementError::server(ErrorMessage::NoBackendConfigured, Some("secret backend"))
        })
    }

    /// Names of the registered backends, lowest priority first
    pub fn registered_backends(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Run health checks on every registered backend
    pub async fn health_check_all(&self) -> Vec<(&'static str, Result<()>)> {
        let mut results = Vec::with_capacity(self.backends.len());
        for backend in self.backends.iter() {
            let result = backend.health_check().await;
            if let Err(e) = &result {
                warn!(backend = backend.name(), error = %e, "Secret backend health check failed");
            }
            results.push((backend.name(), result));
        }
        results
    }
}
