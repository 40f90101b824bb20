use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::{find_override, Action, Identity, PermissionMask, ResourceDomain, RoleRuleTable};

/// Outcome of an access decision.
///
/// `AllowedConditional` is only a grant once the caller has verified that the
/// identity owns the targeted instance; use [`AccessDecision::resolve`] to make
/// that check part of the control flow.
#[must_use]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AccessDecision {
    Allowed,
    AllowedConditional,
    Denied { reason: DenialKind },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// An override for the domain exists and does not grant the action.
    OverrideRestriction,
    /// The identity's role is not in the rule table.
    UnknownRole,
    /// The role default for the domain (0 when absent) lacks the action bit.
    InsufficientRole,
}

impl core::fmt::Display for DenialKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            DenialKind::OverrideRestriction => "denied by explicit override",
            DenialKind::UnknownRole => "role not configured",
            DenialKind::InsufficientRole => "insufficient permissions",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: {0}")]
    Forbidden(DenialKind),

    #[error("forbidden: ownership of the resource instance is required")]
    NotOwner,
}

impl AccessDecision {
    pub fn is_denied(&self) -> bool {
        matches!(self, AccessDecision::Denied { .. })
    }

    pub fn requires_ownership(&self) -> bool {
        matches!(self, AccessDecision::AllowedConditional)
    }

    /// Turn the decision into a final verdict.
    ///
    /// `owns` is only invoked for conditional grants.
    pub fn resolve(self, owns: impl FnOnce() -> bool) -> Result<(), AuthzError> {
        match self {
            AccessDecision::Allowed => Ok(()),
            AccessDecision::AllowedConditional if owns() => Ok(()),
            AccessDecision::AllowedConditional => Err(AuthzError::NotOwner),
            AccessDecision::Denied { reason } => Err(AuthzError::Forbidden(reason)),
        }
    }
}

/// Which rule layer produced a decision.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionLayer {
    Override,
    RoleDefault,
}

/// Three-layer access decision engine.
///
/// - No IO
/// - No panics
/// - Rule table is injected and immutable
#[derive(Debug, Clone)]
pub struct AccessDecisionEngine {
    rules: Arc<RoleRuleTable>,
}

impl AccessDecisionEngine {
    pub fn new(rules: Arc<RoleRuleTable>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RoleRuleTable {
        &self.rules
    }

    /// Decide whether `identity` may perform `action` on `domain`.
    pub fn decide(&self, identity: &Identity, domain: ResourceDomain, action: Action) -> AccessDecision {
        self.evaluate(identity, domain, action).decision
    }

    /// Explain a decision for audit logs and debugging.
    pub fn explain(&self, identity: &Identity, domain: ResourceDomain, action: Action) -> DecisionExplanation {
        let Evaluation {
            decision,
            layer,
            mask,
        } = self.evaluate(identity, domain, action);

        let reason = match (layer, decision) {
            (DecisionLayer::Override, AccessDecision::Denied { .. }) => format!(
                "override '{domain}:{}' does not grant {action}; role defaults were not consulted",
                mask.to_hex_digit()
            ),
            (DecisionLayer::Override, _) => {
                format!("override '{domain}:{}' grants {action}", mask.to_hex_digit())
            }
            (_, AccessDecision::Denied { reason: DenialKind::UnknownRole }) => {
                format!("role '{}' is not in the rule table", identity.role)
            }
            (_, AccessDecision::Denied { .. }) => format!(
                "role '{}' default mask {mask} on {domain} does not grant {action}",
                identity.role
            ),
            (_, AccessDecision::AllowedConditional) => format!(
                "role '{}' grants {action} on {domain} only for owned instances",
                identity.role
            ),
            (_, AccessDecision::Allowed) => {
                format!("role '{}' grants {action} on {domain}", identity.role)
            }
        };

        DecisionExplanation {
            identity_id: identity.id.to_string(),
            role: identity.role.as_str().to_string(),
            resource: domain,
            action,
            decision,
            layer,
            effective_mask: mask.bits(),
            reason,
        }
    }

    fn evaluate(&self, identity: &Identity, domain: ResourceDomain, action: Action) -> Evaluation {
        // Layer 1: overrides are absolute.
        if let Some(mask) = find_override(&identity.overrides, domain) {
            let decision = if mask.allows(action) {
                AccessDecision::Allowed
            } else {
                AccessDecision::Denied {
                    reason: DenialKind::OverrideRestriction,
                }
            };
            return Evaluation {
                decision,
                layer: DecisionLayer::Override,
                mask,
            };
        }

        // Layer 2: role default.
        let Some(rules) = self.rules.rules_for(&identity.role) else {
            return Evaluation {
                decision: AccessDecision::Denied {
                    reason: DenialKind::UnknownRole,
                },
                layer: DecisionLayer::RoleDefault,
                mask: PermissionMask::NONE,
            };
        };

        let rule = rules.get(&domain).copied();
        let mask = rule.map(|r| r.default).unwrap_or(PermissionMask::NONE);

        // Layer 3: conditional ownership flag.
        let decision = match rule {
            Some(r) if mask.allows(action) && r.conditional => AccessDecision::AllowedConditional,
            Some(_) if mask.allows(action) => AccessDecision::Allowed,
            _ => AccessDecision::Denied {
                reason: DenialKind::InsufficientRole,
            },
        };

        Evaluation {
            decision,
            layer: DecisionLayer::RoleDefault,
            mask,
        }
    }
}

struct Evaluation {
    decision: AccessDecision,
    layer: DecisionLayer,
    mask: PermissionMask,
}

/// Detailed explanation of an access decision.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionExplanation {
    pub identity_id: String,
    pub role: String,
    pub resource: ResourceDomain,
    pub action: Action,
    pub decision: AccessDecision,
    pub layer: DecisionLayer,
    /// Mask of the deciding layer (override mask, or role default).
    pub effective_mask: u8,
    pub reason: String,
}
