use axum::{routing::get, Router};

pub mod rbac;
pub mod session;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/authz", rbac::router())
}
