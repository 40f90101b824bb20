use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{PermissionMask, ResourceDomain};

/// Role identifier used for RBAC.
///
/// Roles are opaque strings at this layer so that an identity can carry a role
/// the rule table does not know about; such a role is denied everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role::from_static("admin");
    pub const MANAGER: Role = Role::from_static("manager");
    pub const MEMBER: Role = Role::from_static("member");
    pub const GUEST: Role = Role::from_static("guest");

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Default grant of a role on one resource domain.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleRule {
    pub default: PermissionMask,

    /// The grant only holds when the acting identity owns the targeted
    /// instance. Ownership is checked by the caller.
    #[serde(default)]
    pub conditional: bool,
}

impl RoleRule {
    pub fn new(default: PermissionMask) -> Self {
        Self {
            default,
            conditional: false,
        }
    }

    pub fn conditional(default: PermissionMask) -> Self {
        Self {
            default,
            conditional: true,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleTableError {
    #[error("malformed role table: {0}")]
    Malformed(String),

    #[error("role '{role}' references unknown resource domain '{domain}'")]
    UnknownDomain { role: String, domain: String },
}

/// Immutable `role → domain → rule` table.
///
/// Loaded once at startup and handed to the decision engine; never mutated
/// while serving requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleRuleTable {
    roles: HashMap<Role, BTreeMap<ResourceDomain, RoleRule>>,
}

impl RoleRuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a role with no rules (it exists, but every domain defaults to 0).
    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.entry(role).or_default();
        self
    }

    pub fn with_rule(mut self, role: Role, domain: ResourceDomain, rule: RoleRule) -> Self {
        self.roles.entry(role).or_default().insert(domain, rule);
        self
    }

    /// Rules for a role, or `None` when the role is unknown.
    pub fn rules_for(&self, role: &Role) -> Option<&BTreeMap<ResourceDomain, RoleRule>> {
        self.roles.get(role)
    }

    /// Known roles, sorted by name.
    pub fn roles(&self) -> Vec<&Role> {
        let mut roles: Vec<&Role> = self.roles.keys().collect();
        roles.sort();
        roles
    }

    /// Parse a TOML table shaped `[role."domain"] default = 0..15, conditional = bool`.
    ///
    /// A role may be declared with an empty table (`[guest]`).
    pub fn from_toml_str(input: &str) -> Result<Self, RoleTableError> {
        let raw: HashMap<Role, HashMap<String, RoleRule>> =
            toml::from_str(input).map_err(|e| RoleTableError::Malformed(e.to_string()))?;

        let mut table = Self::new();
        for (role, rules) in raw {
            let mut parsed = BTreeMap::new();
            for (domain, rule) in rules {
                let domain: ResourceDomain =
                    domain.parse().map_err(|_| RoleTableError::UnknownDomain {
                        role: role.as_str().to_string(),
                        domain: domain.clone(),
                    })?;
                parsed.insert(domain, rule);
            }
            table.roles.insert(role, parsed);
        }
        Ok(table)
    }

    /// Built-in table used when no role file is configured.
    pub fn builtin() -> Self {
        use ResourceDomain::*;

        let r = PermissionMask::READ;
        let u = PermissionMask::UPDATE;
        let full = PermissionMask::FULL;

        Self::new()
            .with_rule(Role::ADMIN, SystemUsers, RoleRule::new(full))
            .with_rule(Role::ADMIN, BillingInvoices, RoleRule::new(full))
            .with_rule(Role::ADMIN, InventoryProducts, RoleRule::new(full))
            .with_rule(Role::ADMIN, OrganizationTeam, RoleRule::new(full))
            .with_rule(Role::MANAGER, SystemUsers, RoleRule::new(r))
            .with_rule(Role::MANAGER, BillingInvoices, RoleRule::new(r | u))
            .with_rule(Role::MANAGER, InventoryProducts, RoleRule::new(full))
            .with_rule(Role::MEMBER, SystemUsers, RoleRule::new(PermissionMask::NONE))
            .with_rule(Role::MEMBER, BillingInvoices, RoleRule::conditional(r))
            .with_rule(Role::MEMBER, InventoryProducts, RoleRule::new(r))
            .with_rule(Role::MEMBER, OrganizationTeam, RoleRule::new(r))
            .with_role(Role::GUEST)
    }
}
