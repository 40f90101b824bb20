//! API-side authorization guard.
//!
//! Runs the decision engine for the current identity and settles conditional
//! grants with an ownership check supplied by the handler, so a handler can
//! only proceed on a final verdict.

use tracing::warn;

use tenantguard_auth::{AccessDecision, AccessDecisionEngine, Action, AuthzError, ResourceDomain};

use crate::context::IdentityContext;

/// Authorize `action` on `domain` for the request identity.
///
/// `owns` is consulted only when the role grants the action conditionally.
pub fn authorize(
    engine: &AccessDecisionEngine,
    identity: &IdentityContext,
    domain: ResourceDomain,
    action: Action,
    owns: impl FnOnce() -> bool,
) -> Result<(), AuthzError> {
    let decision = engine.decide(identity.identity(), domain, action);
    let conditional = decision == AccessDecision::AllowedConditional;

    decision.resolve(owns).inspect_err(|err| {
        if conditional {
            warn!(
                target: "security",
                identity_id = %identity.identity_id(),
                resource = %domain,
                action = %action,
                "ownership required and not established"
            );
        } else {
            warn!(
                identity_id = %identity.identity_id(),
                role = %identity.role(),
                resource = %domain,
                action = %action,
                error = %err,
                "access denied"
            );
        }
    })
}
