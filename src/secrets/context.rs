//! Request-scoped collaborators consumed by the secret manager.
//!
//! [`TenantContext`] answers "which tenant is this call for" and
//! [`FeatureFlag`] answers "is secret management switched on". Both are
//! injected at construction; neither is read from global state.

use crate::domain::{Tenant, TenantId};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

/// Supplies the tenant of the current request
pub trait TenantContext: Send + Sync + std::fmt::Debug {
    /// `None` when no tenant is associated with the current call
    fn current_tenant(&self) -> Option<Tenant>;

    fn current_tenant_id(&self) -> Option<TenantId> {
        self.current_tenant().map(|t| t.id)
    }

    fn current_tenant_domain(&self) -> Option<String> {
        self.current_tenant().map(|t| t.domain)
    }
}

/// Always reports the same tenant. Suits single-tenant deployments and tests.
#[derive(Debug, Clone)]
pub struct StaticTenantContext {
    tenant: Tenant,
}

impl StaticTenantContext {
    pub fn new(id: TenantId, domain: impl Into<String>) -> Self {
        Self { tenant: Tenant::new(id, domain) }
    }
}

impl TenantContext for StaticTenantContext {
    fn current_tenant(&self) -> Option<Tenant> {
        Some(self.tenant.clone())
    }
}

tokio::task_local! {
    static CURRENT_TENANT: Tenant;
}

/// Reads the tenant bound to the running task by [`TaskTenantContext::scope`].
///
/// Request handlers wrap their work in `scope` so that every manager call
/// made from that task sees the request's tenant.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskTenantContext;

impl TaskTenantContext {
    /// Run `future` with `tenant` bound as the current tenant
    pub async fn scope<F>(tenant: Tenant, future: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_TENANT.scope(tenant, future).await
    }
}

impl TenantContext for TaskTenantContext {
    fn current_tenant(&self) -> Option<Tenant> {
        CURRENT_TENANT.try_with(Clone::clone).ok()
    }
}

/// Administrative on/off switch for secret management
pub trait FeatureFlag: Send + Sync + std::fmt::Debug {
    fn is_enabled(&self) -> bool;
}

impl FeatureFlag for bool {
    fn is_enabled(&self) -> bool {
        *self
    }
}

impl FeatureFlag for AtomicBool {
    fn is_enabled(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}
