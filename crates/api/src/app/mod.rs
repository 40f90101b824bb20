//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store, directory and engine wiring
//! - `routes/`: HTTP routes + handlers
//! - `errors.rs`: consistent error responses

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower::ServiceBuilder;

use crate::middleware;

pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: AppServices) -> Router {
    let auth_state = middleware::AuthState {
        credentials: services.credentials.clone(),
        directory: services.directory.clone(),
    };

    // Protected routes: require a valid access credential and a known identity.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    // Refresh and logout authenticate with the refresh credential in the body.
    Router::new()
        .route("/health", get(routes::system::health))
        .route("/auth/refresh", post(routes::session::refresh))
        .route("/auth/logout", post(routes::session::logout))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
