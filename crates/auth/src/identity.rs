use serde::{Deserialize, Serialize};

use tenantguard_core::{IdentityId, TenantId};

use crate::{OverrideSet, Role};

/// An authenticated principal as seen by the decision engine.
///
/// Role and overrides are owned by user management; this crate only reads
/// them. `overrides` holds the stored strings verbatim, so that malformed
/// legacy entries are evaluated (and ignored) rather than rejected on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub tenant_id: TenantId,
    pub role: Role,
    #[serde(default)]
    pub overrides: Vec<String>,
}

impl Identity {
    pub fn new(id: IdentityId, tenant_id: TenantId, role: Role) -> Self {
        Self {
            id,
            tenant_id,
            role,
            overrides: Vec::new(),
        }
    }

    /// Attach a validated override set.
    pub fn with_overrides(mut self, overrides: &OverrideSet) -> Self {
        self.overrides = overrides.to_strings();
        self
    }

    /// Attach override strings exactly as stored.
    pub fn with_raw_overrides<I, S>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.overrides = overrides.into_iter().map(Into::into).collect();
        self
    }
}
