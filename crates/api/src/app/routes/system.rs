use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::context::{IdentityContext, TenantContext};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    Extension(tenant): Extension<TenantContext>,
    Extension(identity): Extension<IdentityContext>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "tenant_id": tenant.tenant_id().to_string(),
        "identity_id": identity.identity_id().to_string(),
        "role": identity.role().as_str(),
        "overrides": identity.identity().overrides,
    }))
}
