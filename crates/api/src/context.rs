use tenantguard_auth::{Identity, Role};
use tenantguard_core::{IdentityId, TenantId};

/// Tenant context for a request.
///
/// Derived from the resolved identity, never from client input.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Authenticated identity for a request, as resolved from the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    identity: Identity,
}

impl IdentityContext {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }

    pub fn identity_id(&self) -> IdentityId {
        self.identity.id
    }

    pub fn role(&self) -> &Role {
        &self.identity.role
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}
