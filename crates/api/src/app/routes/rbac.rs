//! Authorization audit endpoints.
//!
//! These answer "why was this request denied?" without performing the
//! request.

use std::collections::BTreeMap;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use tenantguard_auth::{Action, ResourceDomain, RoleRule};
use tenantguard_core::IdentityId;

use crate::app::{errors, services::AppServices};
use crate::authz;
use crate::context::IdentityContext;

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub resource: String,
    pub action: String,
    /// Explain for another identity; requires read access to `system:users`
    /// unless it is the caller.
    pub identity_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct RoleView<'a> {
    role: &'a str,
    rules: &'a BTreeMap<ResourceDomain, RoleRule>,
}

pub fn router() -> Router {
    Router::new()
        .route("/explain", get(explain))
        .route("/roles", get(list_roles))
}

/// GET /authz/explain?resource=&action=[&identity_id=]
pub async fn explain(
    Extension(services): Extension<AppServices>,
    Extension(caller): Extension<IdentityContext>,
    Query(query): Query<ExplainQuery>,
) -> axum::response::Response {
    let resource: ResourceDomain = match query.resource.parse() {
        Ok(r) => r,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_resource", format!("{e}")),
    };
    let action: Action = match query.action.parse() {
        Ok(a) => a,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_action", format!("{e}")),
    };

    let target = match query.identity_id.as_deref() {
        None => caller.identity().clone(),
        Some(raw) => {
            let target_id: IdentityId = match raw.parse() {
                Ok(id) => id,
                Err(e) => {
                    return errors::json_error(StatusCode::BAD_REQUEST, "invalid_identity_id", format!("{e}"));
                }
            };

            if target_id == caller.identity_id() {
                caller.identity().clone()
            } else {
                // Explaining someone else is a user read; nobody owns another identity.
                if let Err(e) = authz::authorize(&services.engine, &caller, ResourceDomain::SystemUsers, Action::Read, || false) {
                    return errors::authz_error_to_response(e);
                }

                match services.directory.find(target_id).await {
                    Ok(Some(identity)) if identity.tenant_id == caller.identity().tenant_id => identity,
                    Ok(_) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "identity not found"),
                    Err(e) => return errors::store_error_to_response(e),
                }
            }
        }
    };

    let explanation = services.engine.explain(&target, resource, action);
    (StatusCode::OK, Json(explanation)).into_response()
}

/// GET /authz/roles - the configured role rule table
pub async fn list_roles(
    Extension(services): Extension<AppServices>,
    Extension(caller): Extension<IdentityContext>,
) -> axum::response::Response {
    if let Err(e) = authz::authorize(&services.engine, &caller, ResourceDomain::SystemUsers, Action::Read, || false) {
        return errors::authz_error_to_response(e);
    }

    let table = services.engine.rules();
    let roles: Vec<RoleView<'_>> = table
        .roles()
        .into_iter()
        .filter_map(|role| {
            table.rules_for(role).map(|rules| RoleView {
                role: role.as_str(),
                rules,
            })
        })
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "roles": roles }))).into_response()
}
