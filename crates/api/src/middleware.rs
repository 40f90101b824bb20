use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::debug;

use tenantguard_infra::{CredentialManager, IdentityDirectory};

use crate::app::errors;
use crate::context::{IdentityContext, TenantContext};

#[derive(Clone)]
pub struct AuthState {
    pub credentials: Arc<CredentialManager>,
    pub directory: Arc<dyn IdentityDirectory>,
}

/// Bearer authentication.
///
/// Verifies the access credential, then loads the identity so that role and
/// override changes apply on the next request. An identity that no longer
/// exists is treated like a bad credential.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers()).map_err(|_| errors::unauthenticated())?;

    let identity_id = state
        .credentials
        .verify_access(token, Utc::now())
        .map_err(errors::credential_error_to_response)?;

    let identity = state
        .directory
        .find(identity_id)
        .await
        .map_err(errors::store_error_to_response)?
        .ok_or_else(|| {
            debug!(identity_id = %identity_id, "credential subject not in directory");
            errors::unauthenticated()
        })?;

    req.extensions_mut()
        .insert(TenantContext::new(identity.tenant_id));
    req.extensions_mut()
        .insert(IdentityContext::new(identity));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}
