use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use tenantguard_auth::AuthzError;
use tenantguard_infra::{CredentialError, StoreError};

/// Uniform 401. Never says which check failed.
pub fn unauthenticated() -> axum::response::Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "invalid or missing credentials")
}

pub fn credential_error_to_response(err: CredentialError) -> axum::response::Response {
    match err {
        err if err.is_rejection() => unauthenticated(),
        CredentialError::Store(e) => store_error_to_response(e),
        other => {
            error!(error = %other, "credential operation failed");
            internal_error()
        }
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    error!(error = %err, "store operation failed");
    internal_error()
}

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

pub fn internal_error() -> axum::response::Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
