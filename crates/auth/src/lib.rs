//! `tenantguard-auth`: pure authorization boundary (zero-trust).
//!
//! This crate is intentionally decoupled from HTTP and storage: it defines the
//! permission vocabulary, the role rule table, per-identity overrides, access
//! credential claims and the three-layer access decision engine.

pub mod authorize;
pub mod claims;
pub mod identity;
pub mod overrides;
pub mod permissions;
pub mod resource;
pub mod roles;

pub use authorize::{
    AccessDecision, AccessDecisionEngine, AuthzError, DecisionExplanation, DecisionLayer, DenialKind,
};
pub use claims::{AccessClaims, TokenValidationError, validate_claims};
pub use identity::Identity;
pub use overrides::{Override, OverrideError, OverrideSet, find_override};
pub use permissions::{Action, PermissionError, PermissionMask};
pub use resource::{ResourceDomain, UnknownResourceDomain};
pub use roles::{Role, RoleRule, RoleRuleTable, RoleTableError};
