//! Refresh credential endpoints.
//!
//! Every rotation failure maps to the same 401; the distinction between
//! unknown, expired and replayed credentials only shows up in logs. A body
//! that does not carry a refresh credential is rejected the same way.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::warn;

use tenantguard_infra::CredentialError;

use crate::app::{errors, services::AppServices};

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /auth/refresh - exchange a refresh credential for a new pair
pub async fn refresh(
    Extension(services): Extension<AppServices>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> axum::response::Response {
    let Ok(Json(body)) = body else {
        return errors::unauthenticated();
    };

    match services.credentials.rotate(&body.refresh_token, Utc::now()).await {
        Ok(issued) => (StatusCode::OK, Json(issued)).into_response(),
        Err(CredentialError::Revoked { identity_id }) => {
            // Replay of a consumed credential: assume it leaked and end every
            // session of the identity.
            warn!(
                target: "security",
                identity_id = %identity_id,
                "refresh credential reuse, revoking all sessions"
            );
            match services.credentials.revoke_all(identity_id).await {
                Ok(_) => errors::unauthenticated(),
                Err(e) => errors::credential_error_to_response(e),
            }
        }
        Err(e) => errors::credential_error_to_response(e),
    }
}

/// POST /auth/logout - revoke a refresh credential; idempotent
pub async fn logout(
    Extension(services): Extension<AppServices>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> axum::response::Response {
    let Ok(Json(body)) = body else {
        return errors::unauthenticated();
    };

    match services.credentials.revoke(&body.refresh_token).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::credential_error_to_response(e),
    }
}
